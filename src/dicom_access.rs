use dicom::core::{Tag, VR};
use dicom::dictionary_std::StandardDataDictionary;
use dicom::object::{DefaultDicomObject, InMemDicomObject};

/// Small helper trait to read attributes from the different DICOM object shapes.
pub trait ElementAccess {
    /// String value without DICOM padding (trailing spaces / NUL).
    fn element_str(&self, tag: Tag) -> Option<String>;
    fn element_vr(&self, tag: Tag) -> Option<VR>;
    /// Tags of every private (odd group) top-level element.
    fn private_tags(&self) -> Vec<Tag>;
}

impl ElementAccess for InMemDicomObject<StandardDataDictionary> {
    fn element_str(&self, tag: Tag) -> Option<String> {
        self.element(tag)
            .ok()
            .and_then(|e| e.to_str().ok())
            .map(|s| {
                s.trim_matches(|c: char| c == '\0' || c.is_whitespace())
                    .to_string()
            })
    }

    fn element_vr(&self, tag: Tag) -> Option<VR> {
        self.element(tag).ok().map(|e| e.header().vr)
    }

    fn private_tags(&self) -> Vec<Tag> {
        self.iter()
            .map(|e| e.header().tag)
            .filter(|tag| tag.group() % 2 == 1)
            .collect()
    }
}

impl ElementAccess for DefaultDicomObject {
    fn element_str(&self, tag: Tag) -> Option<String> {
        (**self).element_str(tag)
    }

    fn element_vr(&self, tag: Tag) -> Option<VR> {
        (**self).element_vr(tag)
    }

    fn private_tags(&self) -> Vec<Tag> {
        (**self).private_tags()
    }
}
