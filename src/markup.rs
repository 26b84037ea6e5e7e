//! Structural feature estimates from storage-format markup.
//!
//! Two strategies are available. [`FeatureDetection::Substring`] counts raw
//! `<img` and `<table` markers and reproduces the numbers in existing CSVs.
//! [`FeatureDetection::Parsed`] walks the markup with `quick-xml` and counts
//! elements, which also sees Confluence's `<ac:image>` macro and ignores
//! markers that only appear inside text. Storage format is not always
//! well-formed XML; on a parse error the substring counts are used instead.

use quick_xml::events::Event;

use crate::config::FeatureDetection;

const IMAGE_MARKER: &str = "<img";
const TABLE_MARKER: &str = "<table";

/// Image and table counts for one body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeatureCounts {
    pub images: u64,
    pub tables: u64,
}

pub fn count_features(markup: &str, mode: FeatureDetection) -> FeatureCounts {
    match mode {
        FeatureDetection::Substring => count_substrings(markup),
        FeatureDetection::Parsed => count_elements(markup).unwrap_or_else(|e| {
            tracing::debug!(error = %e, "markup not parseable; using substring counts");
            count_substrings(markup)
        }),
    }
}

fn count_substrings(markup: &str) -> FeatureCounts {
    FeatureCounts {
        images: markup.matches(IMAGE_MARKER).count() as u64,
        tables: markup.matches(TABLE_MARKER).count() as u64,
    }
}

fn count_elements(markup: &str) -> Result<FeatureCounts, quick_xml::Error> {
    let mut reader = quick_xml::Reader::from_str(markup);
    reader.config_mut().check_end_names = false;

    let mut counts = FeatureCounts::default();
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) => match e.name().as_ref() {
                b"img" | b"ac:image" => counts.images += 1,
                b"table" => counts.tables += 1,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(counts)
}
