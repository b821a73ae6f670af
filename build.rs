fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Only flash builds need the ESP-IDF environment exported; host
    // test builds compile without the toolchain.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
