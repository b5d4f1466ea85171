fn main() {
    // ESP-IDF link environment is only needed for the device build.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
