//! WhatsApp Web links
//!
//! Messages are never sent from here. We build a `send` URL with the text
//! pre-filled and let the user press send in the browser.

use crate::config::MessagingConfig;
use crate::{Error, Result};

const MIN_DIGITS: usize = 10;
const MAX_DIGITS: usize = 15;

/// Normalize a customer phone into international digits.
///
/// Returns `None` when the result is not 10 to 15 digits long.
pub fn normalize_phone(raw: &str, config: &MessagingConfig) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

    let normalized = match digits.len() {
        10 if config
            .mobile_prefix_exempt_areas
            .iter()
            .any(|area| !area.is_empty() && digits.starts_with(area.as_str())) =>
        {
            format!("{}{}", config.country_code, digits)
        }
        10 => format!("{}{}{}", config.country_code, config.mobile_prefix, digits),
        // Leading trunk digit, usually 0
        11 if !digits.starts_with(config.country_code.as_str()) => {
            format!("{}{}", config.country_code, &digits[1..])
        }
        _ => digits,
    };

    (MIN_DIGITS..=MAX_DIGITS)
        .contains(&normalized.len())
        .then_some(normalized)
}

/// WhatsApp Web URL that opens a chat with `text` pre-filled
pub fn whatsapp_url(phone: &str, text: &str, config: &MessagingConfig) -> Result<String> {
    let number = normalize_phone(phone, config)
        .ok_or_else(|| Error::validation(format!("invalid phone number for WhatsApp: {phone}")))?;
    Ok(format!(
        "{}?phone={}&text={}",
        config.base_url.trim_end_matches('?'),
        number,
        urlencoding::encode(text)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalize(raw: &str) -> Option<String> {
        normalize_phone(raw, &MessagingConfig::default())
    }

    #[test]
    fn test_exempt_area_gets_country_code_only() {
        assert_eq!(normalize("11 5555-1234").as_deref(), Some("541155551234"));
    }

    #[test]
    fn test_ten_digits_get_mobile_prefix() {
        assert_eq!(normalize("(351) 555-0101").as_deref(), Some("5493515550101"));
    }

    #[test]
    fn test_trunk_digit_is_dropped() {
        assert_eq!(normalize("03515550101").as_deref(), Some("543515550101"));
    }

    #[test]
    fn test_already_international() {
        assert_eq!(normalize("+54 9 351 555 0101").as_deref(), Some("5493515550101"));
        assert_eq!(normalize("54351555010").as_deref(), Some("54351555010"));
    }

    #[test]
    fn test_invalid_lengths() {
        assert_eq!(normalize(""), None);
        assert_eq!(normalize("555-1234"), None);
        assert_eq!(normalize("1234567890123456"), None);
    }

    #[test]
    fn test_custom_country() {
        let config = MessagingConfig {
            country_code: "34".into(),
            mobile_prefix: String::new(),
            mobile_prefix_exempt_areas: vec![],
            ..MessagingConfig::default()
        };
        assert_eq!(
            normalize_phone("6123456789", &config).as_deref(),
            Some("346123456789")
        );
    }

    #[test]
    fn test_whatsapp_url() {
        let url = whatsapp_url("11 5555-1234", "Hola Ana!\n*Listo* & 100%", &MessagingConfig::default())
            .unwrap();
        assert_eq!(
            url,
            "https://web.whatsapp.com/send?phone=541155551234&text=Hola%20Ana%21%0A%2AListo%2A%20%26%20100%25"
        );
    }

    #[test]
    fn test_whatsapp_url_rejects_bad_phone() {
        let err = whatsapp_url("12", "hi", &MessagingConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
