use url::form_urlencoded;
use url::Url;

use crate::models::dataset::Dataset;

pub const DEFAULT_OPEN_DATA_BASE: &str =
    "https://data.moa.gov.tw/Service/OpenData/TransService.aspx";

pub const DEFAULT_MIRRORS: &[&str] = &[
    "https://api.allorigins.win/raw?url={url}",
    "https://corsproxy.io/?url={url}",
];

const URL_PLACEHOLDER: &str = "{url}";

/// A named upstream endpoint for one dataset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Source {
    pub name: String,
    pub url: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum InvalidMirror {
    #[error("mirror template {0:?} has no {{url}} placeholder")]
    MissingPlaceholder(String),

    #[error("mirror template {0:?} is not a valid URL")]
    BadUrl(String),
}

/// A relay service that takes the upstream URL as an encoded parameter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MirrorTemplate {
    pub name: String,
    template: String,
}

impl MirrorTemplate {
    pub fn parse(template: &str) -> Result<Self, InvalidMirror> {
        let template = template.trim();
        if !template.contains(URL_PLACEHOLDER) {
            return Err(InvalidMirror::MissingPlaceholder(template.to_string()));
        }

        let probe = template.replace(URL_PLACEHOLDER, "x");
        let name = Url::parse(&probe)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .ok_or_else(|| InvalidMirror::BadUrl(template.to_string()))?;

        Ok(Self {
            name,
            template: template.to_string(),
        })
    }

    pub fn wrap(&self, upstream: &str) -> String {
        let encoded: String = form_urlencoded::byte_serialize(upstream.as_bytes()).collect();
        self.template.replace(URL_PLACEHOLDER, &encoded)
    }
}

/// Ordered upstream sources per dataset: the direct feed first, then mirrors
/// in configured priority order.
#[derive(Clone, Debug)]
pub struct SourceCatalog {
    base: String,
    mirrors: Vec<MirrorTemplate>,
}

impl SourceCatalog {
    pub fn new(base: impl Into<String>, mirrors: Vec<MirrorTemplate>) -> Self {
        Self {
            base: base.into(),
            mirrors,
        }
    }

    pub fn direct_url(&self, dataset: Dataset) -> String {
        let separator = if self.base.contains('?') { '&' } else { '?' };
        format!(
            "{}{}UnitId={}&IsTransData=1",
            self.base,
            separator,
            dataset.unit_id()
        )
    }

    pub fn sources(&self, dataset: Dataset) -> Vec<Source> {
        let direct = self.direct_url(dataset);
        let mut sources = Vec::with_capacity(self.mirrors.len() + 1);
        sources.push(Source {
            name: "direct".to_string(),
            url: direct.clone(),
        });
        sources.extend(self.mirrors.iter().map(|mirror| Source {
            name: mirror.name.clone(),
            url: mirror.wrap(&direct),
        }));
        sources
    }
}

impl Default for SourceCatalog {
    fn default() -> Self {
        let mirrors = DEFAULT_MIRRORS
            .iter()
            .filter_map(|template| MirrorTemplate::parse(template).ok())
            .collect();
        Self::new(DEFAULT_OPEN_DATA_BASE, mirrors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_source_comes_first() {
        let catalog = SourceCatalog::default();
        let sources = catalog.sources(Dataset::Adopt);

        assert_eq!(sources.len(), 3);
        assert_eq!(sources[0].name, "direct");
        assert_eq!(
            sources[0].url,
            format!("{DEFAULT_OPEN_DATA_BASE}?UnitId=QcbUEzN6E6DL&IsTransData=1")
        );
        assert_eq!(sources[1].name, "api.allorigins.win");
        assert_eq!(sources[2].name, "corsproxy.io");
    }

    #[test]
    fn mirror_encodes_upstream_url() {
        let mirror = MirrorTemplate::parse("https://relay.example/get?u={url}").unwrap();
        assert_eq!(
            mirror.wrap("https://a.tw/x?UnitId=1&IsTransData=1"),
            "https://relay.example/get?u=https%3A%2F%2Fa.tw%2Fx%3FUnitId%3D1%26IsTransData%3D1"
        );
    }

    #[test]
    fn bad_templates_are_rejected() {
        assert!(matches!(
            MirrorTemplate::parse("https://relay.example/"),
            Err(InvalidMirror::MissingPlaceholder(_))
        ));
        assert!(matches!(
            MirrorTemplate::parse("not a url {url}"),
            Err(InvalidMirror::BadUrl(_))
        ));
    }

    #[test]
    fn base_with_query_appends_parameters() {
        let catalog = SourceCatalog::new("http://127.0.0.1:9/feed?format=json", Vec::new());
        assert_eq!(
            catalog.direct_url(Dataset::Lost),
            "http://127.0.0.1:9/feed?format=json&UnitId=IFJomqVzyB0i&IsTransData=1"
        );
        assert_eq!(catalog.sources(Dataset::Lost).len(), 1);
    }
}
