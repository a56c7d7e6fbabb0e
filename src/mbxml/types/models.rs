//! Data structures shared by the encoder, the decoder and the XML adapter.

/// Magic bytes at the start of every MBXM payload.
pub const MAGIC: &[u8; 4] = b"MBXM";

/// Version byte written by this encoder.
pub const FORMAT_VERSION: u8 = 1;

/// Size of magic + version + reserved bytes.
pub const HEADER_LEN: usize = 8;

/// Wire value for an absent text index or a missing parent.
pub const NONE_INDEX: i32 = -1;

/// Largest string, attribute list or child list a 16-bit field can describe.
pub const MAX_U16_FIELD: usize = u16::MAX as usize;

/// One element of a document tree.
///
/// `text` holds the element's direct text only. `None` and `Some("")` are
/// distinct and both survive a binary round trip.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub text: Option<String>,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            text: None,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style: set direct text.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Builder-style: append an attribute. Duplicate names are kept.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    /// Builder-style: append a child element.
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Returns the first attribute value with the given name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Number of elements in this subtree, including `self`.
    pub fn subtree_len(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(el) = stack.pop() {
            count += 1;
            stack.extend(el.children.iter());
        }
        count
    }
}

// Releases the subtree with a work list instead of one stack frame per level.
impl Drop for Element {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut child) = pending.pop() {
            pending.append(&mut child.children);
        }
    }
}

/// Flat, pre-assembly form of one element.
///
/// String fields are indices into the string pool; `children` and `parent`
/// are indices into the record array.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeRecord {
    pub tag: u32,
    pub text: Option<u32>,
    pub parent: Option<u32>,
    pub attributes: Vec<(u32, u32)>,
    pub children: Vec<u32>,
}

/// Parsed fixed-size header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatHeader {
    pub version: u8,
}

impl Default for FormatHeader {
    fn default() -> Self {
        Self {
            version: FORMAT_VERSION,
        }
    }
}

/// How the decoder treats a version byte other than [`FORMAT_VERSION`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VersionPolicy {
    /// Log a warning and keep decoding.
    #[default]
    Lenient,
    /// Fail with `UnsupportedVersion`.
    Strict,
}

/// How the decoder treats more than one parentless record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RootPolicy {
    /// Fail with `MultipleRoots`.
    #[default]
    Unique,
    /// Return the first parentless record in table order and ignore the rest.
    First,
}

/// Decoder configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    pub version_policy: VersionPolicy,
    pub root_policy: RootPolicy,
}

/// Textual XML load/save configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct XmlOptions {
    /// Keep whitespace-only text fragments when loading.
    pub preserve_whitespace: bool,
    /// Indent written XML by this many spaces per level. `None` writes compact XML.
    pub indent: Option<usize>,
}
