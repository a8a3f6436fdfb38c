//! Listing URL templates with `{keywords}` and `{page}` placeholders.

use super::StrategyConfigError;

const KEYWORDS: &str = "{keywords}";
const PAGE: &str = "{page}";

/// A validated search URL template.
///
/// `{page}` is optional; `{page0}` renders the zero-based page index for
/// sites that count from zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate {
    template: String,
}

impl UrlTemplate {
    pub fn parse(source: &str, template: &str) -> Result<Self, StrategyConfigError> {
        let template = template.trim();
        if !template.starts_with("http://") && !template.starts_with("https://") {
            return Err(StrategyConfigError::InvalidUrlTemplate {
                adapter: source.to_string(),
                message: format!("must be an http(s) URL: {}", template),
            });
        }
        if !template.contains(KEYWORDS) {
            return Err(StrategyConfigError::InvalidUrlTemplate {
                adapter: source.to_string(),
                message: format!("missing {} placeholder", KEYWORDS),
            });
        }
        Ok(Self {
            template: template.to_string(),
        })
    }

    /// Whether the template paginates at all.
    pub fn is_paged(&self) -> bool {
        self.template.contains(PAGE) || self.template.contains("{page0}")
    }

    pub fn render(&self, encoded_keywords: &str, page: u32) -> String {
        self.template
            .replace(KEYWORDS, encoded_keywords)
            .replace("{page0}", &page.saturating_sub(1).to_string())
            .replace(PAGE, &page.to_string())
    }
}
