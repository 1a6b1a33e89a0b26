//! Splitting post text into typed segments using the facets attached to a record.
//!
//! Facet byte ranges index into the UTF-8 encoding of the text. Facets that
//! overlap, fall outside the text, or split a character are ignored and the
//! covered bytes render as plain text.

use serde::Deserialize;

use crate::feed::model::lenient_list;

/// What a facet annotates.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "$type")]
pub enum FacetFeature {
    #[serde(rename = "app.bsky.richtext.facet#link")]
    Link { uri: String },
    #[serde(rename = "app.bsky.richtext.facet#mention")]
    Mention { did: String },
    #[serde(rename = "app.bsky.richtext.facet#tag")]
    Tag { tag: String },
}

/// An annotation over a byte range of text.
///
/// Deserializes from an `app.bsky.richtext.facet`, keeping its first known
/// feature; a facet with none is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "FacetView")]
pub struct Facet {
    pub byte_start: usize,
    pub byte_end: usize,
    pub feature: FacetFeature,
}

#[derive(Deserialize)]
struct FacetView {
    index: ByteSlice,
    #[serde(default, deserialize_with = "lenient_list")]
    features: Vec<FacetFeature>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ByteSlice {
    byte_start: usize,
    byte_end: usize,
}

impl TryFrom<FacetView> for Facet {
    type Error = &'static str;

    fn try_from(view: FacetView) -> Result<Self, Self::Error> {
        let feature = view
            .features
            .into_iter()
            .next()
            .ok_or("facet has no known feature")?;
        Ok(Self {
            byte_start: view.index.byte_start,
            byte_end: view.index.byte_end,
            feature,
        })
    }
}

/// A run of text with an optional annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment<'a> {
    pub text: &'a str,
    pub feature: Option<&'a FacetFeature>,
}

impl Segment<'_> {
    /// Link target for a link segment with an http(s) URI.
    #[must_use]
    pub fn link(&self) -> Option<&str> {
        match self.feature {
            Some(FacetFeature::Link { uri })
                if uri.starts_with("https://") || uri.starts_with("http://") =>
            {
                Some(uri)
            }
            _ => None,
        }
    }

    /// Mentioned DID for a mention segment.
    #[must_use]
    pub fn mention(&self) -> Option<&str> {
        match self.feature {
            Some(FacetFeature::Mention { did }) if did.starts_with("did:") => Some(did),
            _ => None,
        }
    }
}

/// Split `text` into segments following `facets`.
///
/// Adjacent plain runs are never split; an empty text yields no segments.
#[must_use]
pub fn segments<'a>(text: &'a str, facets: &'a [Facet]) -> Vec<Segment<'a>> {
    let mut ordered: Vec<&Facet> = facets
        .iter()
        .filter(|f| {
            f.byte_start < f.byte_end
                && f.byte_end <= text.len()
                && text.is_char_boundary(f.byte_start)
                && text.is_char_boundary(f.byte_end)
        })
        .collect();
    ordered.sort_by_key(|f| (f.byte_start, f.byte_end));

    let mut out = Vec::new();
    let mut pos = 0;
    for facet in ordered {
        if facet.byte_start < pos {
            continue;
        }
        if facet.byte_start > pos {
            out.push(Segment {
                text: &text[pos..facet.byte_start],
                feature: None,
            });
        }
        out.push(Segment {
            text: &text[facet.byte_start..facet.byte_end],
            feature: Some(&facet.feature),
        });
        pos = facet.byte_end;
    }
    if pos < text.len() {
        out.push(Segment {
            text: &text[pos..],
            feature: None,
        });
    }
    out
}
