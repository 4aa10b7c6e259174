//! Machine translation API clients (Google Translate, DeepL)

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

use super::backend::TranslationBackend;
use crate::error::BackendError;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const GOOGLE_SEPARATOR: &str = "\n\u{2029}\n";
const GOOGLE_MAX_MERGED_CHARS: usize = 1500;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MachineTranslateProvider {
    Google,
    DeepL,
}

impl MachineTranslateProvider {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "google" => Some(Self::Google),
            "deepl" => Some(Self::DeepL),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MachineTranslateConfig {
    pub provider: MachineTranslateProvider,
    pub source_lang: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl MachineTranslateConfig {
    pub fn google(source_lang: &str) -> Self {
        Self {
            provider: MachineTranslateProvider::Google,
            source_lang: source_lang.to_string(),
            api_key: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn deepl(source_lang: &str, api_key: String) -> Self {
        Self {
            provider: MachineTranslateProvider::DeepL,
            source_lang: source_lang.to_string(),
            api_key: Some(api_key),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn normalize_lang_google(lang: &str) -> String {
        match lang.to_lowercase().as_str() {
            "auto" | "" => "auto".to_string(),
            "chinese" | "zh-cn" | "zh_cn" | "chs" => "zh-CN".to_string(),
            "zh-tw" | "zh_tw" | "cht" => "zh-TW".to_string(),
            "japanese" | "ja" | "jp" => "ja".to_string(),
            "korean" | "ko" | "kr" => "ko".to_string(),
            "english" | "en" => "en".to_string(),
            "turkish" | "tr" => "tr".to_string(),
            "french" | "fr" => "fr".to_string(),
            "german" | "de" => "de".to_string(),
            "spanish" | "es" => "es".to_string(),
            "russian" | "ru" => "ru".to_string(),
            _ => lang.to_string(),
        }
    }

    pub fn normalize_lang_deepl(lang: &str) -> String {
        match lang.to_lowercase().as_str() {
            "chinese" | "zh-cn" | "zh_cn" | "chs" => "ZH".to_string(),
            "japanese" | "ja" | "jp" => "JA".to_string(),
            "korean" | "ko" | "kr" => "KO".to_string(),
            "english" | "en" => "EN".to_string(),
            "turkish" | "tr" => "TR".to_string(),
            "french" | "fr" => "FR".to_string(),
            "german" | "de" => "DE".to_string(),
            "spanish" | "es" => "ES".to_string(),
            "russian" | "ru" => "RU".to_string(),
            _ => lang.to_uppercase(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct DeepLResponse {
    translations: Vec<DeepLTranslation>,
}

#[derive(Debug, Deserialize)]
struct DeepLTranslation {
    text: String,
}

pub struct MachineTranslateClient {
    config: MachineTranslateConfig,
    client: reqwest::blocking::Client,
}

impl MachineTranslateClient {
    pub fn new(config: MachineTranslateConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { config, client })
    }

    pub fn provider(&self) -> MachineTranslateProvider {
        self.config.provider
    }

    fn translate_google_merged(
        &self,
        texts: &[String],
        target_lang: &str,
    ) -> Vec<Result<String, BackendError>> {
        if texts.is_empty() {
            return vec![];
        }
        let merged_len: usize = texts.iter().map(|t| t.len() + GOOGLE_SEPARATOR.len()).sum();
        if texts.len() == 1 || merged_len > GOOGLE_MAX_MERGED_CHARS {
            return texts
                .iter()
                .map(|t| self.translate_google(t, target_lang))
                .collect();
        }

        let merged = texts.join(GOOGLE_SEPARATOR);
        match self.translate_google(&merged, target_lang) {
            Ok(translated) => {
                let parts: Vec<&str> = translated.split(GOOGLE_SEPARATOR).collect();
                if parts.len() == texts.len() {
                    parts.into_iter().map(|s| Ok(s.trim().to_string())).collect()
                } else {
                    tracing::debug!(
                        "Merged Google batch split into {} parts, expected {}; retrying one by one",
                        parts.len(),
                        texts.len()
                    );
                    texts
                        .iter()
                        .map(|t| self.translate_google(t, target_lang))
                        .collect()
                }
            }
            Err(e) => texts.iter().map(|_| Err(e.clone())).collect(),
        }
    }

    fn translate_google(&self, text: &str, target_lang: &str) -> Result<String, BackendError> {
        let url = format!(
            "https://translate.googleapis.com/translate_a/single?client=gtx&sl={}&tl={}&dt=t&q={}",
            MachineTranslateConfig::normalize_lang_google(&self.config.source_lang),
            MachineTranslateConfig::normalize_lang_google(target_lang),
            urlencoding::encode(text)
        );

        let response = self
            .client
            .get(&url)
            .header("User-Agent", "Mozilla/5.0")
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error("Google Translate", status, String::new()));
        }

        let body = response.text()?;
        let parsed: serde_json::Value = serde_json::from_str(&body).map_err(|e| {
            BackendError::InvalidResponse(format!("Google Translate returned non-JSON: {}", e))
        })?;

        let mut result = String::new();
        if let Some(outer) = parsed.get(0).and_then(|v| v.as_array()) {
            for item in outer {
                if let Some(translated) = item.get(0).and_then(|v| v.as_str()) {
                    result.push_str(translated);
                }
            }
        }

        if result.is_empty() {
            return Err(BackendError::InvalidResponse(
                "No translation result from Google".to_string(),
            ));
        }

        Ok(result)
    }

    fn translate_deepl_batch(
        &self,
        texts: &[String],
        target_lang: &str,
    ) -> Result<Vec<String>, BackendError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| BackendError::InvalidResponse("DeepL API key is required".into()))?;

        let base_url = if api_key.ends_with(":fx") {
            "https://api-free.deepl.com/v2"
        } else {
            "https://api.deepl.com/v2"
        };

        let target = MachineTranslateConfig::normalize_lang_deepl(target_lang);
        let source = MachineTranslateConfig::normalize_lang_deepl(&self.config.source_lang);

        let mut form_params: Vec<(&str, &str)> = texts.iter().map(|t| ("text", t.as_str())).collect();
        form_params.push(("target_lang", &target));
        if source != "AUTO" {
            form_params.push(("source_lang", &source));
        }

        let response = self
            .client
            .post(format!("{}/translate", base_url))
            .header("Authorization", format!("DeepL-Auth-Key {}", api_key))
            .form(&form_params)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(status_error("DeepL", status, body));
        }

        let result: DeepLResponse = response.json()?;
        if result.translations.len() != texts.len() {
            return Err(BackendError::InvalidResponse(format!(
                "DeepL returned {} translations for {} texts",
                result.translations.len(),
                texts.len()
            )));
        }

        Ok(result.translations.into_iter().map(|t| t.text).collect())
    }
}

impl TranslationBackend for MachineTranslateClient {
    fn name(&self) -> &str {
        match self.config.provider {
            MachineTranslateProvider::Google => "google",
            MachineTranslateProvider::DeepL => "deepl",
        }
    }

    fn translate(&self, text: &str, target_lang: &str) -> Result<String, BackendError> {
        match self.config.provider {
            MachineTranslateProvider::Google => self.translate_google(text, target_lang),
            MachineTranslateProvider::DeepL => {
                let texts = [text.to_string()];
                self.translate_deepl_batch(&texts, target_lang)?
                    .pop()
                    .ok_or_else(|| BackendError::InvalidResponse("Empty DeepL response".into()))
            }
        }
    }

    fn translate_batch(
        &self,
        texts: &[String],
        target_lang: &str,
    ) -> Vec<Result<String, BackendError>> {
        match self.config.provider {
            MachineTranslateProvider::Google => self.translate_google_merged(texts, target_lang),
            MachineTranslateProvider::DeepL => match self.translate_deepl_batch(texts, target_lang) {
                Ok(translations) => translations.into_iter().map(Ok).collect(),
                Err(e) => texts.iter().map(|_| Err(e.clone())).collect(),
            },
        }
    }
}

fn status_error(service: &str, status: StatusCode, body: String) -> BackendError {
    let message = if body.is_empty() {
        format!("{} request failed ({})", service, status)
    } else {
        format!("{} request failed ({}): {}", service, status, body)
    };
    match status.as_u16() {
        429 | 456 => BackendError::RateLimited(message),
        408 | 504 => BackendError::Timeout(message),
        s if s >= 500 => BackendError::NetworkFailure(message),
        _ => BackendError::InvalidResponse(message),
    }
}
