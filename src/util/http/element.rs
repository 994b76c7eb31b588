use scraper::{ElementRef, Html};

/// Why a labelled value could not be located in a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Missing {
    /// No element carries the label text.
    Label,
    /// The label exists but has no element after it.
    Sibling,
}

/// Read access to "label followed by value" pairs of a parsed page.
///
/// Quote pages lay their figures out as `<th>Open</th><td>1,000.00</td>`: a
/// node holding the label and, right after it, a sibling holding the value.
pub trait LabeledDocument {
    /// Returns the raw text of the element that follows the element labelled
    /// `label`. The text is returned untrimmed.
    fn sibling_text(&self, label: &str) -> Result<String, Missing>;
}

impl LabeledDocument for Html {
    fn sibling_text(&self, label: &str) -> Result<String, Missing> {
        let label_element = find_label(self, label).ok_or(Missing::Label)?;
        let value_element = next_sibling_element(&label_element).ok_or(Missing::Sibling)?;

        Ok(value_element.text().collect::<String>())
    }
}

/// Finds the first leaf element (no element children) whose trimmed text equals `label`.
///
/// Restricting the match to leaves keeps a `<tr>` that happens to contain only
/// the label from shadowing the `<th>` inside it.
pub fn find_label<'a>(document: &'a Html, label: &str) -> Option<ElementRef<'a>> {
    document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|e| !e.children().any(|c| c.value().is_element()))
        .find(|e| e.text().collect::<String>().trim() == label)
}

/// The next sibling that is an element; text and comment nodes in between are skipped.
pub fn next_sibling_element<'a>(element: &ElementRef<'a>) -> Option<ElementRef<'a>> {
    element.next_siblings().find_map(ElementRef::wrap)
}
