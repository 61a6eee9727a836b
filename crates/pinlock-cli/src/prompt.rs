use anyhow::{anyhow, Result};
use pinlock_core::PinPolicy;
use zeroize::Zeroizing;

pub const PIN_ENV: &str = "PINLOCK_PIN";
pub const NEW_PIN_ENV: &str = "PINLOCK_NEW_PIN";

fn from_env(var: &str) -> Option<Zeroizing<String>> {
    match std::env::var(var) {
        Ok(pin) if !pin.is_empty() => Some(Zeroizing::new(pin)),
        _ => None,
    }
}

/// Reads the current PIN. No format check: whatever was stored is compared
/// verbatim.
pub fn prompt_pin(prompt: &str) -> Result<Zeroizing<String>> {
    if let Some(pin) = from_env(PIN_ENV) {
        return Ok(pin);
    }
    let pin = rpassword::prompt_password(prompt).map_err(|e| anyhow!("PIN prompt: {e}"))?;
    Ok(Zeroizing::new(pin))
}

/// Reads a new PIN twice and checks it against `policy`.
pub fn prompt_new_pin(prompt: &str, policy: &PinPolicy) -> Result<Zeroizing<String>> {
    let pin = match from_env(NEW_PIN_ENV) {
        Some(pin) => pin,
        None => {
            let first = Zeroizing::new(
                rpassword::prompt_password(prompt).map_err(|e| anyhow!("PIN prompt: {e}"))?,
            );
            let second = Zeroizing::new(
                rpassword::prompt_password("Confirm PIN: ")
                    .map_err(|e| anyhow!("PIN prompt: {e}"))?,
            );
            if *first != *second {
                return Err(anyhow!("PINs do not match"));
            }
            first
        }
    };
    policy.validate(&pin)?;
    Ok(pin)
}
