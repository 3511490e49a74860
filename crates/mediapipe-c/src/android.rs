//! Android entry point.

use std::sync::Arc;

use jni::objects::{JObject, JString};
use jni::sys::{jobject, jstring};
use jni::JNIEnv;
use mediapipe_core::resources::{self, android::AndroidAssets};

use crate::error::set_last_error;

/// Serve graph resources from the APK of `android_context`, extracting them
/// under `cache_dir_path`. Call once before creating instances.
///
/// # Safety
/// `env` must be the calling thread's JNI environment and the object
/// arguments local references valid for this call.
#[no_mangle]
pub unsafe extern "C" fn mp_init_asset_manager(
    env: *mut jni::sys::JNIEnv,
    android_context: jobject,
    cache_dir_path: jstring,
) {
    let mut env = match unsafe { JNIEnv::from_raw(env) } {
        Ok(env) => env,
        Err(err) => {
            set_last_error(format!("jni: {}", err));
            return;
        }
    };
    let context = unsafe { JObject::from_raw(android_context) };
    let cache_dir = unsafe { JString::from_raw(cache_dir_path) };

    match AndroidAssets::new(&mut env, &context, &cache_dir) {
        Ok(assets) => resources::set_provider(Arc::new(assets)),
        Err(err) => set_last_error(err),
    }
}
