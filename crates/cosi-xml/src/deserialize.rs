//! XML deserialization: parsing backend response bodies into Rust types.
//!
//! Each document type implements [`XmlDeserialize`] and names the element it
//! is read from. [`from_xml`] checks that the root element matches before
//! handing the reader over.

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::error::XmlError;

/// Trait for deserializing types from XML.
///
/// The opening tag has already been consumed by the caller; the
/// implementation reads child elements until the matching end tag.
pub trait XmlDeserialize: Sized {
    /// Name of the element this type is read from.
    const ELEMENT: &'static str;

    /// Deserialize an instance from the given XML reader.
    ///
    /// # Errors
    ///
    /// Returns `XmlError` if the XML is malformed or required fields are missing.
    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError>;
}

/// Deserialize an XML document into a typed value.
///
/// # Errors
///
/// Returns [`XmlError::UnexpectedElement`] if the root element is not
/// `T::ELEMENT`, and other `XmlError` variants if the XML is malformed.
pub fn from_xml<T: XmlDeserialize>(xml: &[u8]) -> Result<T, XmlError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    // Skip the XML declaration and find the root element.
    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.name();
                if name.as_ref() != T::ELEMENT.as_bytes() {
                    return Err(XmlError::UnexpectedElement(format!(
                        "expected <{}>, found <{}>",
                        T::ELEMENT,
                        String::from_utf8_lossy(name.as_ref())
                    )));
                }
                return T::deserialize_xml(&mut reader);
            }
            Event::Eof => {
                return Err(XmlError::MissingElement(T::ELEMENT.to_owned()));
            }
            _ => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Helper functions for reading common XML patterns
// ---------------------------------------------------------------------------

/// Visit each child element of the current element.
///
/// `visit` receives the reader positioned after the child's start tag and
/// must consume through its end tag, typically with [`read_text_content`],
/// [`skip_element`] or a nested `deserialize_xml`. Self-closing children are
/// ignored. Returns once the parent's end tag is consumed.
pub(crate) fn for_each_child<F>(
    reader: &mut Reader<&[u8]>,
    context: &str,
    mut visit: F,
) -> Result<(), XmlError>
where
    F: FnMut(&mut Reader<&[u8]>, &str) -> Result<(), XmlError>,
{
    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.name();
                let tag_name = std::str::from_utf8(name.as_ref())
                    .map_err(|err| XmlError::ParseError(err.to_string()))?;
                visit(reader, tag_name)?;
            }
            Event::End(_) => return Ok(()),
            Event::Eof => {
                return Err(XmlError::UnexpectedElement(format!(
                    "unexpected EOF in {context}"
                )));
            }
            _ => {}
        }
    }
}

/// Read the text content of the current element and consume its end tag.
pub(crate) fn read_text_content(reader: &mut Reader<&[u8]>) -> Result<String, XmlError> {
    let mut text = String::new();
    loop {
        match reader.read_event()? {
            Event::Text(e) => {
                let decoded = e
                    .decode()
                    .map_err(|err| XmlError::ParseError(err.to_string()))?;
                let unescaped = quick_xml::escape::unescape(&decoded)
                    .map_err(|err| XmlError::ParseError(err.to_string()))?;
                text.push_str(&unescaped);
            }
            Event::GeneralRef(e) => {
                if let Some(ch) = e
                    .resolve_char_ref()
                    .map_err(|err| XmlError::ParseError(err.to_string()))?
                {
                    text.push(ch);
                } else {
                    let entity = e
                        .decode()
                        .map_err(|err| XmlError::ParseError(err.to_string()))?;
                    let resolved = quick_xml::escape::resolve_predefined_entity(&entity)
                        .ok_or_else(|| XmlError::ParseError(format!("unknown entity &{entity};")))?;
                    text.push_str(resolved);
                }
            }
            Event::End(_) => {
                return Ok(text);
            }
            Event::Eof => {
                return Err(XmlError::UnexpectedElement(
                    "unexpected EOF while reading text content".to_string(),
                ));
            }
            _ => {}
        }
    }
}

/// Skip over an element and all its children.
pub(crate) fn skip_element(reader: &mut Reader<&[u8]>) -> Result<(), XmlError> {
    let mut depth: u32 = 1;
    loop {
        match reader.read_event()? {
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
            Event::Eof => {
                return Err(XmlError::UnexpectedElement(
                    "unexpected EOF while skipping element".to_string(),
                ));
            }
            _ => {}
        }
    }
}

/// Read a `<ResponseMetadata>` element and return its `RequestId`.
pub(crate) fn read_request_id(reader: &mut Reader<&[u8]>) -> Result<String, XmlError> {
    let mut request_id = String::new();
    for_each_child(reader, "ResponseMetadata", |reader, tag| {
        match tag {
            "RequestId" => request_id = read_text_content(reader)?,
            _ => skip_element(reader)?,
        }
        Ok(())
    })?;
    Ok(request_id)
}
