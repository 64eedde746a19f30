#![forbid(unsafe_code)]

//! Built-in pane kinds.
//!
//! | kind       | priority        | renders                                   |
//! |------------|-----------------|-------------------------------------------|
//! | `Text`     | fixed `0`       | anything, as its short text form          |
//! | `Markdown` | dynamic `0.1`   | strings                                   |
//! | `Json`     | dynamic `0.2+`  | lists, maps, strings holding JSON         |
//! | `Html`     | dynamic `0.3`   | host objects with an HTML representation  |
//! | `Image`    | dynamic `0.8`   | PNG, JPEG and GIF bytes                   |
//!
//! [`default_registry`] registers them in this order.

use std::sync::{Arc, OnceLock};

use base64::Engine as _;
use serde_json::json;
use trellis_core::{
    Applies, BuildStep, Error, Hints, PaneKind, PaneRegistry, PaneRegistryBuilder, Props, Result,
    Value,
};

/// Process-wide registry holding every built-in kind.
pub fn default_registry() -> Arc<PaneRegistry> {
    static REGISTRY: OnceLock<Arc<PaneRegistry>> = OnceLock::new();
    Arc::clone(REGISTRY.get_or_init(|| Arc::new(register_builtin(PaneRegistry::builder()).build())))
}

/// Append the built-in kinds to `builder`, for applications that register
/// their own kinds alongside them.
#[must_use]
pub fn register_builtin(builder: PaneRegistryBuilder) -> PaneRegistryBuilder {
    builder
        .register(Text)
        .register(Markdown)
        .register(Json)
        .register(Html)
        .register(Image)
}

fn props<const N: usize>(pairs: [(&str, serde_json::Value); N]) -> Props {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

/// Fallback kind: renders the value's short text form.
#[derive(Debug, Clone, Copy, Default)]
pub struct Text;

impl PaneKind for Text {
    fn name(&self) -> &'static str {
        "Text"
    }

    fn priority(&self) -> Option<f64> {
        Some(0.0)
    }

    fn applies(&self, _value: &Value, _hints: &Hints) -> Applies {
        Applies::Yes
    }

    fn build(&self, value: &Value) -> Result<BuildStep> {
        Ok(BuildStep::Props(props([("text", json!(value.repr()))])))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Markdown;

impl PaneKind for Markdown {
    fn name(&self) -> &'static str {
        "Markdown"
    }

    fn priority(&self) -> Option<f64> {
        None
    }

    fn applies(&self, value: &Value, _hints: &Hints) -> Applies {
        Applies::from(value.as_str().map(|_| 0.1))
    }

    fn build(&self, value: &Value) -> Result<BuildStep> {
        let text = value
            .as_str()
            .ok_or_else(|| Error::render("Markdown", format!("expected str, got {}", value.type_name())))?;
        Ok(BuildStep::Props(props([("text", json!(text))])))
    }
}

/// Structured data. Strings qualify only when they parse as a JSON object or
/// array, and then outrank markdown.
#[derive(Debug, Clone, Copy, Default)]
pub struct Json;

impl Json {
    fn parse(value: &Value) -> Option<serde_json::Value> {
        match value {
            Value::List(_) | Value::Map(_) => Some(value.to_json()),
            Value::Str(s) => {
                let trimmed = s.trim_start();
                if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
                    return None;
                }
                serde_json::from_str(s).ok()
            }
            _ => None,
        }
    }
}

impl PaneKind for Json {
    fn name(&self) -> &'static str {
        "Json"
    }

    fn priority(&self) -> Option<f64> {
        None
    }

    fn applies(&self, value: &Value, hints: &Hints) -> Applies {
        if !matches!(value, Value::List(_) | Value::Map(_) | Value::Str(_)) {
            return Applies::No;
        }
        // A `depth` hint signals structured display was asked for.
        let boost = if hints.get("depth").is_some() { 0.1 } else { 0.0 };
        Applies::from(Self::parse(value).map(|_| 0.2 + boost))
    }

    fn build(&self, value: &Value) -> Result<BuildStep> {
        let data =
            Self::parse(value).ok_or_else(|| Error::render("Json", "value is not valid JSON"))?;
        Ok(BuildStep::Props(props([("data", data)])))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Html;

impl PaneKind for Html {
    fn name(&self) -> &'static str {
        "Html"
    }

    fn priority(&self) -> Option<f64> {
        None
    }

    fn applies(&self, value: &Value, _hints: &Hints) -> Applies {
        Applies::from(value.as_custom().and_then(|obj| obj.html()).map(|_| 0.3))
    }

    fn build(&self, value: &Value) -> Result<BuildStep> {
        let html = value
            .as_custom()
            .and_then(|obj| obj.html())
            .ok_or_else(|| Error::render("Html", "object has no HTML representation"))?;
        Ok(BuildStep::Props(props([("text", json!(html))])))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ImageFormat {
    Png,
    Jpeg,
    Gif,
}

impl ImageFormat {
    fn sniff(data: &[u8]) -> Option<Self> {
        if data.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some(Self::Png)
        } else if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(Self::Jpeg)
        } else if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            Some(Self::Gif)
        } else {
            None
        }
    }

    const fn mime(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
        }
    }

    /// Pixel dimensions read from the header, where the format keeps them
    /// at a fixed offset.
    fn dimensions(self, data: &[u8]) -> Result<Option<(u32, u32)>> {
        match self {
            Self::Png => {
                let header = data
                    .get(16..24)
                    .ok_or_else(|| Error::render("Image", "truncated PNG header"))?;
                let width = u32::from_be_bytes([header[0], header[1], header[2], header[3]]);
                let height = u32::from_be_bytes([header[4], header[5], header[6], header[7]]);
                Ok(Some((width, height)))
            }
            Self::Gif => {
                let header = data
                    .get(6..10)
                    .ok_or_else(|| Error::render("Image", "truncated GIF header"))?;
                let width = u16::from_le_bytes([header[0], header[1]]);
                let height = u16::from_le_bytes([header[2], header[3]]);
                Ok(Some((u32::from(width), u32::from(height))))
            }
            Self::Jpeg => Ok(None),
        }
    }
}

/// Raster image bytes. Value changes replace the rendered model.
#[derive(Debug, Clone, Copy, Default)]
pub struct Image;

impl PaneKind for Image {
    fn name(&self) -> &'static str {
        "Image"
    }

    fn priority(&self) -> Option<f64> {
        None
    }

    fn applies(&self, value: &Value, _hints: &Hints) -> Applies {
        Applies::from(value.as_bytes().and_then(ImageFormat::sniff).map(|_| 0.8))
    }

    fn supports_inplace_update(&self) -> bool {
        false
    }

    fn build(&self, value: &Value) -> Result<BuildStep> {
        let data = value
            .as_bytes()
            .ok_or_else(|| Error::render("Image", format!("expected bytes, got {}", value.type_name())))?;
        let format =
            ImageFormat::sniff(data).ok_or_else(|| Error::render("Image", "unrecognized image format"))?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(data);
        let mut out = props([
            ("mime", json!(format.mime())),
            ("data", json!(encoded)),
        ]);
        if let Some((width, height)) = format.dimensions(data)? {
            out.insert("width".into(), json!(width));
            out.insert("height".into(), json!(height));
        }
        Ok(BuildStep::Props(out))
    }
}
