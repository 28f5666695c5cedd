//! Generates the Kotlin and Swift bindings of `greencard-core`.

fn main() {
    uniffi::uniffi_bindgen_main();
}
