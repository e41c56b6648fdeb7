use std::collections::HashMap;
use std::fs;
use std::sync::{Arc, OnceLock};

use anyhow::Result;
use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource, FluentValue};
use unic_langid::LanguageIdentifier;

/// Interface languages shipped with the bot.
const SUPPORTED_LANGUAGES: &[&str] = &["en"];
const FALLBACK_LANGUAGE: &str = "en";

/// Localization manager backed by Fluent resource files under
/// `./locales/<lang>/main.ftl`.
pub struct LocalizationManager {
    bundles: HashMap<String, Arc<FluentBundle<FluentResource>>>,
}

impl LocalizationManager {
    pub fn new() -> Result<Self> {
        let mut bundles = HashMap::new();
        for lang in SUPPORTED_LANGUAGES {
            let locale: LanguageIdentifier = lang.parse()?;
            let bundle = Self::create_bundle(&locale)?;
            bundles.insert(lang.to_string(), Arc::new(bundle));
        }
        Ok(Self { bundles })
    }

    fn create_bundle(locale: &LanguageIdentifier) -> Result<FluentBundle<FluentResource>> {
        let mut bundle = FluentBundle::new_concurrent(vec![locale.clone()]);
        // Directional isolation marks would corrupt the HTML we emit
        bundle.set_use_isolating(false);

        let resource_path = format!("./locales/{}/main.ftl", locale);
        if let Ok(content) = fs::read_to_string(&resource_path) {
            if let Ok(resource) = FluentResource::try_new(content) {
                let _ = bundle.add_resource(resource);
            }
        }

        Ok(bundle)
    }

    pub fn is_language_supported(&self, lang: &str) -> bool {
        self.bundles.contains_key(lang)
    }

    pub fn get_message_in_language(
        &self,
        key: &str,
        lang: &str,
        args: Option<&HashMap<&str, &str>>,
    ) -> String {
        let bundle = self
            .bundles
            .get(lang)
            .or_else(|| self.bundles.get(FALLBACK_LANGUAGE))
            .expect("fallback language bundle must exist");

        let msg = match bundle.get_message(key) {
            Some(msg) => msg,
            None => return format!("Missing translation: {}", key),
        };

        let pattern = match msg.value() {
            Some(pattern) => pattern,
            None => return format!("Missing value for key: {}", key),
        };

        let mut value = String::new();
        if let Some(args) = args {
            let fluent_args =
                FluentArgs::from_iter(args.iter().map(|(k, v)| (*k, FluentValue::from(*v))));
            let _ = bundle.write_pattern(&mut value, pattern, Some(&fluent_args), &mut vec![]);
        } else {
            let _ = bundle.write_pattern(&mut value, pattern, None, &mut vec![]);
        }

        value
    }
}

static LOCALIZATION_MANAGER: OnceLock<LocalizationManager> = OnceLock::new();

/// Initialize the global localization manager. Safe to call repeatedly
/// (tests do); only the first call loads resources.
pub fn init_localization() -> Result<()> {
    if LOCALIZATION_MANAGER.get().is_none() {
        let manager = LocalizationManager::new()?;
        let _ = LOCALIZATION_MANAGER.set(manager);
    }
    Ok(())
}

pub fn get_localization_manager() -> &'static LocalizationManager {
    LOCALIZATION_MANAGER
        .get()
        .expect("Localization manager not initialized")
}

/// Resolve a (possibly region-qualified) language code to a supported
/// interface language, falling back to English.
pub fn detect_language(language_code: Option<&str>) -> &'static str {
    let manager = get_localization_manager();
    if let Some(code) = language_code {
        let base = code.split('-').next().unwrap_or(code);
        for supported in SUPPORTED_LANGUAGES.iter().copied() {
            if supported == base && manager.is_language_supported(supported) {
                return supported;
            }
        }
    }
    FALLBACK_LANGUAGE
}

/// Get a localized message in the fallback language.
pub fn t(key: &str) -> String {
    get_localization_manager().get_message_in_language(key, FALLBACK_LANGUAGE, None)
}

/// Get a localized message for the given language code.
pub fn t_lang(key: &str, language_code: Option<&str>) -> String {
    let lang = detect_language(language_code);
    get_localization_manager().get_message_in_language(key, lang, None)
}

/// Get a localized message with arguments for the given language code.
pub fn t_args_lang(key: &str, args: &[(&str, &str)], language_code: Option<&str>) -> String {
    let lang = detect_language(language_code);
    let args_map: HashMap<&str, &str> = args.iter().cloned().collect();
    get_localization_manager().get_message_in_language(key, lang, Some(&args_map))
}
