//! Packets: the unit of data flowing through a graph
//!
//! A packet is a shared, immutable value plus a timestamp. Cloning a packet
//! clones the `Arc`, never the payload.

use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::frame::ImageFrame;
use crate::landmark::{LandmarkList, NormalizedLandmarkList};
use crate::rect::Rect;

/// Type names reported for each packet kind.
pub mod type_name {
    pub const INT: &str = "int";
    pub const FLOAT: &str = "float";
    pub const BOOL: &str = "bool";
    pub const IMAGE_FRAME: &str = "::mediapipe::ImageFrame";
    pub const LANDMARK_LIST: &str = "::mediapipe::LandmarkList";
    pub const NORMALIZED_LANDMARK_LIST: &str = "::mediapipe::NormalizedLandmarkList";
    pub const LANDMARK_LIST_VECTOR: &str = "std::vector<::mediapipe::LandmarkList>";
    pub const NORMALIZED_LANDMARK_LIST_VECTOR: &str =
        "std::vector<::mediapipe::NormalizedLandmarkList>";
    pub const RECT_VECTOR: &str = "std::vector<::mediapipe::Rect>";
    pub const NORMALIZED_RECT_VECTOR: &str = "std::vector<::mediapipe::NormalizedRect>";
}

/// Position of a packet in its stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Timestamp of packets that have not entered a stream yet.
    pub const UNSET: Timestamp = Timestamp(i64::MIN);

    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(self) -> i64 {
        self.0
    }

    pub fn is_set(self) -> bool {
        self != Self::UNSET
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_set() {
            write!(f, "{}", self.0)
        } else {
            f.write_str("unset")
        }
    }
}

/// Payload carried by a packet.
#[derive(Debug, Clone, PartialEq)]
pub enum PacketValue {
    Int(i32),
    Float(f32),
    Bool(bool),
    Image(ImageFrame),
    Landmarks(LandmarkList),
    NormLandmarks(NormalizedLandmarkList),
    MultiLandmarks(Vec<LandmarkList>),
    MultiNormLandmarks(Vec<NormalizedLandmarkList>),
    Rects(Vec<Rect>),
    NormRects(Vec<Rect>),
}

impl PacketValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Int(_) => type_name::INT,
            Self::Float(_) => type_name::FLOAT,
            Self::Bool(_) => type_name::BOOL,
            Self::Image(_) => type_name::IMAGE_FRAME,
            Self::Landmarks(_) => type_name::LANDMARK_LIST,
            Self::NormLandmarks(_) => type_name::NORMALIZED_LANDMARK_LIST,
            Self::MultiLandmarks(_) => type_name::LANDMARK_LIST_VECTOR,
            Self::MultiNormLandmarks(_) => type_name::NORMALIZED_LANDMARK_LIST_VECTOR,
            Self::Rects(_) => type_name::RECT_VECTOR,
            Self::NormRects(_) => type_name::NORMALIZED_RECT_VECTOR,
        }
    }
}

/// A timestamped, shared value.
#[derive(Debug, Clone)]
pub struct Packet {
    value: Arc<PacketValue>,
    timestamp: Timestamp,
}

macro_rules! packet_getter {
    ($name:ident, $variant:ident, $out:ty, $expected:expr) => {
        pub fn $name(&self) -> Result<&$out> {
            match self.value.as_ref() {
                PacketValue::$variant(v) => Ok(v),
                other => Err(Error::TypeMismatch {
                    expected: $expected,
                    actual: other.type_name(),
                }),
            }
        }
    };
}

impl Packet {
    pub fn new(value: PacketValue) -> Self {
        Self {
            value: Arc::new(value),
            timestamp: Timestamp::UNSET,
        }
    }

    pub fn int(value: i32) -> Self {
        Self::new(PacketValue::Int(value))
    }

    pub fn float(value: f32) -> Self {
        Self::new(PacketValue::Float(value))
    }

    pub fn bool(value: bool) -> Self {
        Self::new(PacketValue::Bool(value))
    }

    pub fn image(frame: ImageFrame) -> Self {
        Self::new(PacketValue::Image(frame))
    }

    /// Same payload, new timestamp.
    pub fn at(&self, timestamp: Timestamp) -> Self {
        Self {
            value: Arc::clone(&self.value),
            timestamp,
        }
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn value(&self) -> &PacketValue {
        &self.value
    }

    pub fn type_name(&self) -> &'static str {
        self.value.type_name()
    }

    pub fn get_int(&self) -> Result<i32> {
        match self.value.as_ref() {
            PacketValue::Int(v) => Ok(*v),
            other => Err(Error::TypeMismatch {
                expected: type_name::INT,
                actual: other.type_name(),
            }),
        }
    }

    pub fn get_float(&self) -> Result<f32> {
        match self.value.as_ref() {
            PacketValue::Float(v) => Ok(*v),
            other => Err(Error::TypeMismatch {
                expected: type_name::FLOAT,
                actual: other.type_name(),
            }),
        }
    }

    pub fn get_bool(&self) -> Result<bool> {
        match self.value.as_ref() {
            PacketValue::Bool(v) => Ok(*v),
            other => Err(Error::TypeMismatch {
                expected: type_name::BOOL,
                actual: other.type_name(),
            }),
        }
    }

    packet_getter!(get_image, Image, ImageFrame, type_name::IMAGE_FRAME);
    packet_getter!(get_landmarks, Landmarks, LandmarkList, type_name::LANDMARK_LIST);
    packet_getter!(
        get_norm_landmarks,
        NormLandmarks,
        NormalizedLandmarkList,
        type_name::NORMALIZED_LANDMARK_LIST
    );
    packet_getter!(
        get_multi_landmarks,
        MultiLandmarks,
        Vec<LandmarkList>,
        type_name::LANDMARK_LIST_VECTOR
    );
    packet_getter!(
        get_multi_norm_landmarks,
        MultiNormLandmarks,
        Vec<NormalizedLandmarkList>,
        type_name::NORMALIZED_LANDMARK_LIST_VECTOR
    );
    packet_getter!(get_rects, Rects, Vec<Rect>, type_name::RECT_VECTOR);
    packet_getter!(get_norm_rects, NormRects, Vec<Rect>, type_name::NORMALIZED_RECT_VECTOR);
}

impl From<PacketValue> for Packet {
    fn from(value: PacketValue) -> Self {
        Packet::new(value)
    }
}

impl From<ImageFrame> for Packet {
    fn from(frame: ImageFrame) -> Self {
        Packet::image(frame)
    }
}

impl From<LandmarkList> for Packet {
    fn from(list: LandmarkList) -> Self {
        Packet::new(PacketValue::Landmarks(list))
    }
}

impl From<NormalizedLandmarkList> for Packet {
    fn from(list: NormalizedLandmarkList) -> Self {
        Packet::new(PacketValue::NormLandmarks(list))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::ImageFormat;
    use crate::landmark::Landmark;

    #[test]
    fn test_scalar_round_trip() {
        assert_eq!(Packet::int(-42).get_int().unwrap(), -42);
        assert_eq!(Packet::float(0.25).get_float().unwrap(), 0.25);
        assert!(Packet::bool(true).get_bool().unwrap());
    }

    #[test]
    fn test_wrong_accessor_is_type_mismatch() {
        let packet = Packet::float(1.0);
        match packet.get_int() {
            Err(Error::TypeMismatch { expected, actual }) => {
                assert_eq!(expected, "int");
                assert_eq!(actual, "float");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(packet.get_image().is_err());
    }

    #[test]
    fn test_type_names() {
        let frame = ImageFrame::new(ImageFormat::Gray8, 1, 1, vec![0]).unwrap();
        assert_eq!(Packet::image(frame).type_name(), "::mediapipe::ImageFrame");
        let list = NormalizedLandmarkList::new(vec![Landmark::new(0.1, 0.2, 0.3)]);
        assert_eq!(
            Packet::from(list).type_name(),
            "::mediapipe::NormalizedLandmarkList"
        );
        assert_eq!(
            Packet::new(PacketValue::NormRects(vec![])).type_name(),
            "std::vector<::mediapipe::NormalizedRect>"
        );
    }

    #[test]
    fn test_at_shares_payload() {
        let packet = Packet::int(7);
        assert!(!packet.timestamp().is_set());
        let stamped = packet.at(Timestamp::new(3));
        assert_eq!(stamped.timestamp().value(), 3);
        assert!(Arc::ptr_eq(&packet.value, &stamped.value));
    }
}
