//! Decoder registration metadata and output class tables

/// Identification of the decoder for a host application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub longname: &'static str,
    pub desc: &'static str,
    pub license: &'static str,
    pub inputs: &'static [&'static str],
    pub tags: &'static [&'static str],
}

pub static DECODER_INFO: DecoderInfo = DecoderInfo {
    id: "onfi",
    name: "ONFI",
    longname: "ONFI NAND Flash",
    desc: "ONFI NAND Flash interface, used by MicroSD cards, pendrives, TSOP48, BGA152, BGA362.",
    license: "gplv2+",
    inputs: &["logic"],
    tags: &["IC", "Memory", "NAND Flash"],
};

/// One entry of an output class table: (id, description)
pub type ClassInfo = (&'static str, &'static str);

/// Indexed by [`AnnotationClass::index`](super::types::AnnotationClass::index)
pub static ANNOTATIONS: [ClassInfo; 5] = [
    ("data", "Data"),
    ("addr", "Address"),
    ("cmd", "Command"),
    ("status", "Status"),
    ("warnings", "Warnings"),
];

pub static BINARY_CLASSES: [ClassInfo; 1] = [("data", "AAAA:DD")];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::decoders::types::AnnotationClass;

    #[test]
    fn test_annotation_table_order() {
        assert_eq!(ANNOTATIONS[AnnotationClass::Data.index()].0, "data");
        assert_eq!(ANNOTATIONS[AnnotationClass::Warnings.index()].0, "warnings");
        assert_eq!(BINARY_CLASSES[0].1, "AAAA:DD");
        assert_eq!(DECODER_INFO.id, "onfi");
    }
}
