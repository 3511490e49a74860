//! `#[repr(C)]` mirrors of the structs in `mediapipe.h`.

use std::os::raw::{c_int, c_longlong};
use std::ptr;

use mediapipe_core::{Landmark, Rect};
use mediapipe_ffi_common::{
    c_int_to_len, free_boxed_slice, len_to_c_int, vec_from_raw, vec_into_raw,
};

/// `mp_image`: borrowed pixel data. `format` holds an `mp_image_format` value.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ImageC {
    pub data: *const u8,
    pub width: c_int,
    pub height: c_int,
    pub format: c_int,
}

/// `mp_landmark`
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LandmarkC {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub visibility: f32,
    pub presence: f32,
}

impl From<&Landmark> for LandmarkC {
    fn from(landmark: &Landmark) -> Self {
        Self {
            x: landmark.x,
            y: landmark.y,
            z: landmark.z,
            visibility: landmark.visibility,
            presence: landmark.presence,
        }
    }
}

/// `mp_landmark_list`: owns `elements` until `mp_destroy_landmarks`.
#[repr(C)]
#[derive(Debug)]
pub struct LandmarkListC {
    pub elements: *mut LandmarkC,
    pub length: c_int,
}

impl LandmarkListC {
    pub(crate) fn from_landmarks(landmarks: &[Landmark]) -> Self {
        let (elements, len) = vec_into_raw(landmarks.iter().map(LandmarkC::from).collect());
        Self {
            elements,
            length: len_to_c_int(len),
        }
    }

    /// Borrow the elements as a slice.
    ///
    /// # Safety
    /// `elements` must come from [`from_landmarks`](Self::from_landmarks)
    /// and not have been released.
    pub unsafe fn as_slice(&self) -> &[LandmarkC] {
        if self.elements.is_null() {
            return &[];
        }
        unsafe { std::slice::from_raw_parts(self.elements, c_int_to_len(self.length)) }
    }

    /// Free the element buffer.
    ///
    /// # Safety
    /// Must be called at most once per list.
    pub(crate) unsafe fn release(&mut self) {
        unsafe { free_boxed_slice(self.elements, c_int_to_len(self.length)) };
        self.elements = ptr::null_mut();
        self.length = 0;
    }
}

/// `mp_multi_face_landmark_list`: one landmark list per detected face or hand.
#[repr(C)]
#[derive(Debug)]
pub struct MultiFaceLandmarkListC {
    pub elements: *mut LandmarkListC,
    pub length: c_int,
}

impl MultiFaceLandmarkListC {
    pub(crate) fn from_lists<'a>(lists: impl Iterator<Item = &'a [Landmark]>) -> Self {
        let (elements, len) = vec_into_raw(lists.map(LandmarkListC::from_landmarks).collect());
        Self {
            elements,
            length: len_to_c_int(len),
        }
    }

    /// # Safety
    /// Same contract as [`LandmarkListC::as_slice`].
    pub unsafe fn as_slice(&self) -> &[LandmarkListC] {
        if self.elements.is_null() {
            return &[];
        }
        unsafe { std::slice::from_raw_parts(self.elements, c_int_to_len(self.length)) }
    }

    /// # Safety
    /// Must be called at most once per list.
    pub(crate) unsafe fn release(&mut self) {
        let lists = unsafe { vec_from_raw(self.elements, c_int_to_len(self.length)) };
        for mut list in lists {
            unsafe { list.release() };
        }
        self.elements = ptr::null_mut();
        self.length = 0;
    }
}

/// `mp_rect`
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RectC {
    pub x_center: f32,
    pub y_center: f32,
    pub width: f32,
    pub height: f32,
    pub rotation: f32,
    pub id: c_longlong,
}

impl From<&Rect> for RectC {
    fn from(rect: &Rect) -> Self {
        Self {
            x_center: rect.x_center,
            y_center: rect.y_center,
            width: rect.width,
            height: rect.height,
            rotation: rect.rotation,
            id: rect.id,
        }
    }
}

/// `mp_rect_list`
#[repr(C)]
#[derive(Debug)]
pub struct RectListC {
    pub elements: *mut RectC,
    pub length: c_int,
}

impl RectListC {
    pub(crate) fn from_rects(rects: &[Rect]) -> Self {
        let (elements, len) = vec_into_raw(rects.iter().map(RectC::from).collect());
        Self {
            elements,
            length: len_to_c_int(len),
        }
    }

    /// # Safety
    /// Same contract as [`LandmarkListC::as_slice`].
    pub unsafe fn as_slice(&self) -> &[RectC] {
        if self.elements.is_null() {
            return &[];
        }
        unsafe { std::slice::from_raw_parts(self.elements, c_int_to_len(self.length)) }
    }

    /// # Safety
    /// Must be called at most once per list.
    pub(crate) unsafe fn release(&mut self) {
        unsafe { free_boxed_slice(self.elements, c_int_to_len(self.length)) };
        self.elements = ptr::null_mut();
        self.length = 0;
    }
}
