//! XLIFF 2.0 interchange codec.
//!
//! [`XliffSerializer`] maps jobs to documents and back; [`XliffLoader`]
//! moves documents over byte streams.

pub mod html;
pub mod serializer;
pub mod xliff;

pub use serializer::{SerializerOptions, XliffSerializer};
pub use xliff::{
    FileEntry, Segment, SegmentState, UnitPart, XliffDocument, XliffFile, XliffLoader, XliffUnit,
    XLIFF_NAMESPACE, XLIFF_VERSION,
};
