//! Read-only preview URLs.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use bitpreview_core::{Bitstream, ItemRef};

/// Characters escaped in bitstream names; path separators stay literal.
const NAME_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/');

/// Build the preview URL for a bitstream.
///
/// The identifier segment prefers the item handle, then the item id, then the
/// bare bitstream id. The filename is percent-encoded, and `allowed` becomes
/// the `isAllowed=y|n` flag.
pub fn compose_preview_url(
    item: Option<&ItemRef>,
    bitstream: &Bitstream,
    base_path: &str,
    allowed: bool,
) -> String {
    let identifier = match item {
        Some(ItemRef {
            handle: Some(handle),
            ..
        }) => format!("handle/{handle}"),
        Some(item) => format!("item/{}", item.id),
        None => format!("id/{}", bitstream.id),
    };

    let mut url = format!(
        "{}/api/core/bitstreams/{identifier}",
        base_path.trim_end_matches('/')
    );

    if let Some(name) = bitstream.name.as_deref() {
        url.push('/');
        url.extend(utf8_percent_encode(name, NAME_ENCODE_SET));
    }

    url.push_str(&format!("?sequence={}", bitstream.sequence_id));
    url.push_str(if allowed { "&isAllowed=y" } else { "&isAllowed=n" });
    url
}
