//! Track label templating.
//!
//! Templates use foobar2000-style field references such as
//! `%artist% - %title%`. Providers that can evaluate the template themselves
//! (beefweb) pass it through untouched; the rest render it here from the
//! track metadata they fetched.

/// Metadata available to a label template
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackFields {
    pub artist: String,
    pub title: String,
    pub album: String,
    pub track_number: Option<u32>,
    /// 1-based position in the playlist
    pub list_index: usize,
}

impl TrackFields {
    fn lookup(&self, field: &str) -> Option<String> {
        match field.to_lowercase().as_str() {
            "artist" | "album artist" => Some(self.artist.clone()),
            "title" => Some(self.title.clone()),
            "album" => Some(self.album.clone()),
            "track number" | "tracknumber" => {
                self.track_number.map(|n| format!("{:02}", n))
            }
            "list index" => Some(format!("{:02}", self.list_index)),
            _ => None,
        }
    }
}

/// Render a template against track metadata.
///
/// Unknown or empty fields render as `?`, the way foobar2000 shows them.
/// `%%` produces a literal percent sign; an unterminated `%` is copied as is.
pub fn render(template: &str, fields: &TrackFields) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('%') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('%') {
            Some(0) => {
                out.push('%');
                rest = &after[1..];
            }
            Some(end) => {
                let value = fields
                    .lookup(&after[..end])
                    .filter(|v| !v.is_empty())
                    .unwrap_or_else(|| "?".to_string());
                out.push_str(&value);
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
