//! Landmarks produced by detection graphs
//!
//! Hand and pose indices use the fixed ordinals of the landmark models,
//! mirrored by `mp_hand_landmark` / `mp_pose_landmark` in the C header.

use serde::{Deserialize, Serialize};

/// A 3D point with confidence scores.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    #[serde(default)]
    pub visibility: f32,
    #[serde(default)]
    pub presence: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            x,
            y,
            z,
            ..Default::default()
        }
    }

    pub fn with_scores(mut self, visibility: f32, presence: f32) -> Self {
        self.visibility = visibility;
        self.presence = presence;
        self
    }
}

/// Landmarks in image pixel / world coordinates.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LandmarkList {
    pub landmarks: Vec<Landmark>,
}

/// Landmarks with x and y normalized to `[0, 1]` by image width and height.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizedLandmarkList {
    pub landmarks: Vec<Landmark>,
}

macro_rules! landmark_list_impl {
    ($list:ty) => {
        impl $list {
            pub fn new(landmarks: Vec<Landmark>) -> Self {
                Self { landmarks }
            }

            pub fn len(&self) -> usize {
                self.landmarks.len()
            }

            pub fn is_empty(&self) -> bool {
                self.landmarks.is_empty()
            }

            pub fn get(&self, index: usize) -> Option<&Landmark> {
                self.landmarks.get(index)
            }

            /// Look up a hand landmark by its model ordinal.
            pub fn hand(&self, landmark: HandLandmark) -> Option<&Landmark> {
                self.get(landmark.index())
            }

            /// Look up a pose landmark by its model ordinal.
            pub fn pose(&self, landmark: PoseLandmark) -> Option<&Landmark> {
                self.get(landmark.index())
            }
        }

        impl From<Vec<Landmark>> for $list {
            fn from(landmarks: Vec<Landmark>) -> Self {
                Self { landmarks }
            }
        }
    };
}

landmark_list_impl!(LandmarkList);
landmark_list_impl!(NormalizedLandmarkList);

/// Hand landmark ordinals (21 points).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum HandLandmark {
    Wrist = 0,
    ThumbCmc = 1,
    ThumbMcp = 2,
    ThumbIp = 3,
    ThumbTip = 4,
    IndexFingerMcp = 5,
    IndexFingerPip = 6,
    IndexFingerDip = 7,
    IndexFingerTip = 8,
    MiddleFingerMcp = 9,
    MiddleFingerPip = 10,
    MiddleFingerDip = 11,
    MiddleFingerTip = 12,
    RingFingerMcp = 13,
    RingFingerPip = 14,
    RingFingerDip = 15,
    RingFingerTip = 16,
    PinkyMcp = 17,
    PinkyPip = 18,
    PinkyDip = 19,
    PinkyTip = 20,
}

impl HandLandmark {
    pub const COUNT: usize = 21;

    pub const ALL: [HandLandmark; Self::COUNT] = [
        Self::Wrist,
        Self::ThumbCmc,
        Self::ThumbMcp,
        Self::ThumbIp,
        Self::ThumbTip,
        Self::IndexFingerMcp,
        Self::IndexFingerPip,
        Self::IndexFingerDip,
        Self::IndexFingerTip,
        Self::MiddleFingerMcp,
        Self::MiddleFingerPip,
        Self::MiddleFingerDip,
        Self::MiddleFingerTip,
        Self::RingFingerMcp,
        Self::RingFingerPip,
        Self::RingFingerDip,
        Self::RingFingerTip,
        Self::PinkyMcp,
        Self::PinkyPip,
        Self::PinkyDip,
        Self::PinkyTip,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// Pose landmark ordinals (33 points).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum PoseLandmark {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl PoseLandmark {
    pub const COUNT: usize = 33;

    pub const ALL: [PoseLandmark; Self::COUNT] = [
        Self::Nose,
        Self::LeftEyeInner,
        Self::LeftEye,
        Self::LeftEyeOuter,
        Self::RightEyeInner,
        Self::RightEye,
        Self::RightEyeOuter,
        Self::LeftEar,
        Self::RightEar,
        Self::MouthLeft,
        Self::MouthRight,
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::LeftElbow,
        Self::RightElbow,
        Self::LeftWrist,
        Self::RightWrist,
        Self::LeftPinky,
        Self::RightPinky,
        Self::LeftIndex,
        Self::RightIndex,
        Self::LeftThumb,
        Self::RightThumb,
        Self::LeftHip,
        Self::RightHip,
        Self::LeftKnee,
        Self::RightKnee,
        Self::LeftAnkle,
        Self::RightAnkle,
        Self::LeftHeel,
        Self::RightHeel,
        Self::LeftFootIndex,
        Self::RightFootIndex,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordinals_are_dense() {
        for (i, landmark) in HandLandmark::ALL.iter().enumerate() {
            assert_eq!(landmark.index(), i);
        }
        for (i, landmark) in PoseLandmark::ALL.iter().enumerate() {
            assert_eq!(landmark.index(), i);
        }
        assert_eq!(HandLandmark::PinkyTip as i32, 20);
        assert_eq!(PoseLandmark::RightFootIndex as i32, 32);
        assert_eq!(HandLandmark::from_index(21), None);
    }

    #[test]
    fn test_named_lookup() {
        let list: NormalizedLandmarkList = (0..HandLandmark::COUNT)
            .map(|i| Landmark::new(i as f32, 0.0, 0.0))
            .collect::<Vec<_>>()
            .into();
        assert_eq!(list.hand(HandLandmark::IndexFingerTip).unwrap().x, 8.0);
        assert!(list.pose(PoseLandmark::LeftHip).is_none());
    }
}
