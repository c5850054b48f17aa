use isolang::Language;

use crate::errors::{TextLensError, TextLensResult};

/// Turns a BCP 47 language tag into a name a person can read.
pub trait LocaleNames: Send + Sync {
    fn display_name(&self, tag: &str, display_locale: &str) -> TextLensResult<String>;
}

/// ISO 639 lookup backed by `isolang`. Only English display names are available.
#[derive(Debug, Clone, Copy, Default)]
pub struct IsoLocaleNames;

impl LocaleNames for IsoLocaleNames {
    fn display_name(&self, tag: &str, display_locale: &str) -> TextLensResult<String> {
        if primary_subtag(display_locale) != Some("en".to_string()) {
            return Err(TextLensError::LocaleResolutionFailed(format!(
                "{tag} (display locale {display_locale})"
            )));
        }

        let primary =
            primary_subtag(tag).ok_or_else(|| TextLensError::LocaleResolutionFailed(tag.into()))?;
        let language = match primary.len() {
            2 => Language::from_639_1(&primary),
            3 => Language::from_639_3(&primary),
            _ => None,
        };
        language
            .map(|l| everyday_name(l.to_name()))
            .ok_or_else(|| TextLensError::LocaleResolutionFailed(tag.into()))
    }
}

/// Resolves `tag`, falling back to the tag itself when no name is known.
pub fn name_or_tag(names: &dyn LocaleNames, tag: &str, display_locale: &str) -> String {
    match names.display_name(tag, display_locale) {
        Ok(name) => name,
        Err(e) => {
            tracing::debug!(tag, error = %e, "no display name, using raw tag");
            tag.to_string()
        }
    }
}

/// ISO 639-3 reference names carry qualifiers people do not use:
/// `"Modern Greek (1453-)"` is shown as `"Greek"`, `"Malay (macrolanguage)"` as `"Malay"`.
fn everyday_name(reference: &str) -> String {
    let name = match reference.find(" (") {
        Some(pos) => &reference[..pos],
        None => reference,
    };
    name.strip_prefix("Modern ").unwrap_or(name).to_string()
}

/// Lowercased language subtag (`"pt-BR"` → `"pt"`), if it is alphabetic.
fn primary_subtag(tag: &str) -> Option<String> {
    let primary = tag.trim().split(['-', '_']).next()?;
    if primary.is_empty() || !primary.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    Some(primary.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_common_tags() {
        let names = IsoLocaleNames;
        assert_eq!(names.display_name("fr", "en").unwrap(), "French");
        assert_eq!(names.display_name("es", "en").unwrap(), "Spanish");
        assert_eq!(names.display_name("pt-BR", "en").unwrap(), "Portuguese");
        assert_eq!(names.display_name("DE", "en-US").unwrap(), "German");
    }

    #[test]
    fn reference_qualifiers_are_dropped() {
        assert_eq!(everyday_name("Modern Greek (1453-)"), "Greek");
        assert_eq!(everyday_name("Malay (macrolanguage)"), "Malay");
        assert_eq!(everyday_name("Swahili (macrolanguage)"), "Swahili");
        assert_eq!(everyday_name("Japanese"), "Japanese");
        assert_eq!(IsoLocaleNames.display_name("el", "en").unwrap(), "Greek");
    }

    #[test]
    fn unknown_tag_falls_back_to_itself() {
        let names = IsoLocaleNames;
        assert!(matches!(
            names.display_name("zz", "en"),
            Err(TextLensError::LocaleResolutionFailed(_))
        ));
        assert_eq!(name_or_tag(&names, "zz", "en"), "zz");
        assert_eq!(name_or_tag(&names, "q1-x", "en"), "q1-x");
    }

    #[test]
    fn non_english_display_locale_falls_back() {
        assert_eq!(name_or_tag(&IsoLocaleNames, "fr", "de"), "fr");
    }
}
