//! Tests for environment-driven client settings.
//!
//! Environment variables are process-global, so everything lives in one
//! test function to avoid ordering races between parallel tests.

use dreamright_gemini::GeminiSettings;
use tempfile::TempDir;

#[test]
fn settings_resolve_from_env_with_fallbacks() {
    // Clean slate
    for key in [
        "GOOGLE_API_KEY",
        "GEMINI_API_KEY",
        "DREAMRIGHT_TEXT_MODEL",
        "DREAMRIGHT_IMAGE_MODEL",
        "DREAMRIGHT_TIER",
    ] {
        unsafe { std::env::remove_var(key) };
    }

    // No key set at all
    assert!(GeminiSettings::from_env().is_err());

    // GEMINI_API_KEY works as a fallback
    unsafe { std::env::set_var("GEMINI_API_KEY", "fallback-key") };
    let settings = GeminiSettings::from_env().unwrap();
    assert_eq!(settings.api_key, "fallback-key");
    assert_eq!(settings.text_model, "gemini-2.5-flash");
    assert_eq!(settings.image_model, "gemini-2.5-flash-image");
    assert!(settings.tier.is_none());

    // GOOGLE_API_KEY wins over the fallback
    unsafe { std::env::set_var("GOOGLE_API_KEY", "primary-key") };
    let settings = GeminiSettings::from_env().unwrap();
    assert_eq!(settings.api_key, "primary-key");

    // A project .env loaded with dotenvy feeds the same lookup
    let temp_dir = TempDir::new().unwrap();
    let env_file = temp_dir.path().join(".env");
    std::fs::write(
        &env_file,
        "DREAMRIGHT_TEXT_MODEL=gemini-2.5-pro\nDREAMRIGHT_TIER=tier1\n",
    )
    .unwrap();
    dotenvy::from_path(&env_file).unwrap();

    let settings = GeminiSettings::from_env().unwrap();
    assert_eq!(settings.text_model, "gemini-2.5-pro");
    assert_eq!(settings.tier.as_deref(), Some("tier1"));

    for key in [
        "GOOGLE_API_KEY",
        "GEMINI_API_KEY",
        "DREAMRIGHT_TEXT_MODEL",
        "DREAMRIGHT_TIER",
    ] {
        unsafe { std::env::remove_var(key) };
    }
}
