//! Bakes the WiFi credentials from `.env` (or the environment) into the image.

const CREDENTIAL_KEYS: [&str; 2] = ["WIFI_SSID", "WIFI_PASSWORD"];

fn main() {
    println!("cargo:rustc-link-arg=-Tlinkall.x");
    println!("cargo:rerun-if-changed=.env");

    // A missing .env is fine when the variables come from the environment.
    let _ = dotenvy::dotenv();

    for key in CREDENTIAL_KEYS {
        println!("cargo:rerun-if-env-changed={key}");
        let value = std::env::var(key)
            .unwrap_or_else(|_| panic!("{key} must be set in .env or the environment"));
        println!("cargo:rustc-env={key}={value}");
    }
}
