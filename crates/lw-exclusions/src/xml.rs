//! On-disk form of the exclusion cache.
//!
//! ```xml
//! <LocalItemExclusions>
//!   <TeamProjectCollection id="..." uri="...">
//!     <DefaultExclusions watermark="..." lastDefaultExclusionUpdate="...">
//!       <Exclusion>*.dll</Exclusion>
//!     </DefaultExclusions>
//!   </TeamProjectCollection>
//! </LocalItemExclusions>
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use lw_types::Guid;
use quick_xml::se::Serializer;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ExclusionError, ExclusionResult};
use crate::set::{unknown_update_time, ExclusionSet};

const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n";

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename = "LocalItemExclusions")]
struct Document {
    #[serde(rename = "TeamProjectCollection", default)]
    collections: Vec<CollectionElement>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CollectionElement {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@uri", default)]
    uri: String,
    #[serde(rename = "DefaultExclusions", default, skip_serializing_if = "Option::is_none")]
    defaults: Option<DefaultsElement>,
}

#[derive(Debug, Serialize, Deserialize)]
struct DefaultsElement {
    #[serde(rename = "@watermark", default)]
    watermark: String,
    #[serde(rename = "@lastDefaultExclusionUpdate", default)]
    last_update: String,
    #[serde(rename = "Exclusion", default)]
    exclusions: Vec<String>,
}

/// One collection's entry in the cache file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredCollection {
    pub uri: String,
    pub set: ExclusionSet,
}

/// Parse the cache file. Collections with an unreadable id are skipped.
pub fn parse(text: &str) -> ExclusionResult<BTreeMap<Guid, StoredCollection>> {
    let document: Document = quick_xml::de::from_str(text)?;
    let mut collections = BTreeMap::new();
    for element in document.collections {
        let id = match Guid::parse(&element.id) {
            Ok(id) => id,
            Err(e) => {
                warn!(id = %element.id, error = %e, "skipping exclusion collection with bad id");
                continue;
            }
        };
        let set = match element.defaults {
            Some(defaults) => ExclusionSet::from_parts(
                Guid::parse(&defaults.watermark).unwrap_or(Guid::EMPTY),
                parse_time(&defaults.last_update),
                defaults.exclusions,
            ),
            None => ExclusionSet::new(),
        };
        collections.insert(id, StoredCollection { uri: element.uri, set });
    }
    Ok(collections)
}

/// Render `collections` as the cache file.
pub fn render(collections: &BTreeMap<Guid, StoredCollection>) -> ExclusionResult<String> {
    let document = Document {
        collections: collections
            .iter()
            .map(|(id, stored)| CollectionElement {
                id: id.to_string(),
                uri: stored.uri.clone(),
                defaults: Some(DefaultsElement {
                    watermark: stored.set.watermark().to_string(),
                    last_update: stored
                        .set
                        .last_default_exclusion_update()
                        .to_rfc3339_opts(SecondsFormat::Millis, true),
                    exclusions: stored.set.exclusions(),
                }),
            })
            .collect(),
    };

    let mut out = String::from(XML_DECLARATION);
    let mut serializer = Serializer::new(&mut out);
    serializer.indent(' ', 2);
    document
        .serialize(serializer)
        .map_err(|e| ExclusionError::Serialize(e.to_string()))?;
    out.push('\n');
    Ok(out)
}

fn parse_time(text: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|_| unknown_update_time())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_then_parse() {
        let id = Guid::new();
        let watermark = Guid::new();
        let mut set = ExclusionSet::new();
        set.set_default_exclusions(watermark, ["*.o", "target"]);
        let mut collections = BTreeMap::new();
        collections.insert(
            id,
            StoredCollection {
                uri: "https://tfs.example/collection".into(),
                set: set.clone(),
            },
        );

        let text = render(&collections).unwrap();
        assert!(text.starts_with("<?xml"));
        assert!(text.contains("<Exclusion>*.o</Exclusion>"));

        let parsed = parse(&text).unwrap();
        let stored = &parsed[&id];
        assert_eq!(stored.uri, "https://tfs.example/collection");
        assert_eq!(stored.set.exclusions(), set.exclusions());
        assert_eq!(stored.set.watermark(), watermark);
        assert_eq!(
            stored.set.last_default_exclusion_update().timestamp_millis(),
            set.last_default_exclusion_update().timestamp_millis()
        );
    }

    #[test]
    fn parses_hand_written_file() {
        let text = r#"<?xml version="1.0" encoding="utf-8"?>
<LocalItemExclusions>
  <TeamProjectCollection id="{6A1E5B4C-2D3F-4E5A-8B9C-0D1E2F3A4B5C}" uri="http://server:8080/tfs/c">
    <DefaultExclusions watermark="00000000-0000-0000-0000-000000000000" lastDefaultExclusionUpdate="garbage">
      <Exclusion>bin</Exclusion>
      <Exclusion>obj</Exclusion>
    </DefaultExclusions>
  </TeamProjectCollection>
  <TeamProjectCollection id="not-a-guid" uri="x"/>
  <TeamProjectCollection id="11111111-2222-3333-4444-555555555555" uri="y"/>
</LocalItemExclusions>"#;
        let parsed = parse(text).unwrap();
        assert_eq!(parsed.len(), 2);

        let first = &parsed[&Guid::parse("6a1e5b4c-2d3f-4e5a-8b9c-0d1e2f3a4b5c").unwrap()];
        assert_eq!(first.set.exclusions(), vec!["bin", "obj"]);
        assert_eq!(first.set.last_default_exclusion_update(), unknown_update_time());

        // No DefaultExclusions element: the built-in list applies.
        let second = &parsed[&Guid::parse("11111111-2222-3333-4444-555555555555").unwrap()];
        assert_eq!(second.set.exclusions(), ExclusionSet::new().exclusions());
    }

    #[test]
    fn empty_document() {
        assert!(parse("<LocalItemExclusions/>").unwrap().is_empty());
        let text = render(&BTreeMap::new()).unwrap();
        assert!(parse(&text).unwrap().is_empty());
    }

    #[test]
    fn malformed_document_is_an_error() {
        assert!(matches!(parse("<LocalItemExclusions><Team"), Err(ExclusionError::Xml(_))));
    }
}
