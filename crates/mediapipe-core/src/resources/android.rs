//! APK asset access through the Java `AssetManager`.
//!
//! Assets are copied into the application's cache directory the first time
//! they are resolved, so calculators can treat them as ordinary files.

use std::path::{Path, PathBuf};

use jni::objects::{GlobalRef, JObject, JString, JValue};
use jni::{JNIEnv, JavaVM};
use tracing::{debug, info};

use super::ResourceProvider;
use crate::error::{Error, Result};

const READ_CHUNK: i32 = 64 * 1024;

fn jni_error(err: jni::errors::Error) -> Error {
    Error::Resource(format!("jni: {}", err))
}

/// Resource provider backed by the APK's assets.
pub struct AndroidAssets {
    vm: JavaVM,
    asset_manager: GlobalRef,
    cache_dir: PathBuf,
}

impl AndroidAssets {
    /// Capture the asset manager of `context` and the cache directory path
    /// (`context.getCacheDir().getAbsolutePath()`).
    pub fn new(env: &mut JNIEnv, context: &JObject, cache_dir: &JString) -> Result<Self> {
        let vm = env.get_java_vm().map_err(jni_error)?;
        let cache_dir: String = env.get_string(cache_dir).map_err(jni_error)?.into();

        let assets = env
            .call_method(
                context,
                "getAssets",
                "()Landroid/content/res/AssetManager;",
                &[],
            )
            .and_then(|value| value.l())
            .map_err(jni_error)?;
        let asset_manager = env.new_global_ref(assets).map_err(jni_error)?;

        info!(cache_dir = %cache_dir, "android asset manager initialized");

        Ok(Self {
            vm,
            asset_manager,
            cache_dir: PathBuf::from(cache_dir),
        })
    }

    fn extract(&self, path: &str, target: &Path) -> Result<()> {
        let mut env = self.vm.attach_current_thread().map_err(jni_error)?;

        let name = env.new_string(path).map_err(jni_error)?;
        let stream = env
            .call_method(
                self.asset_manager.as_obj(),
                "open",
                "(Ljava/lang/String;)Ljava/io/InputStream;",
                &[JValue::Object(&name)],
            )
            .and_then(|value| value.l())
            .map_err(|e| Error::Resource(format!("asset {} not found: {}", path, e)))?;

        let buffer = env.new_byte_array(READ_CHUNK).map_err(jni_error)?;
        let mut chunk = vec![0i8; READ_CHUNK as usize];
        let mut bytes = Vec::new();

        loop {
            let read = env
                .call_method(&stream, "read", "([B)I", &[JValue::Object(&buffer)])
                .and_then(|value| value.i())
                .map_err(jni_error)?;
            if read < 0 {
                break;
            }
            let read = read as usize;
            env.get_byte_array_region(&buffer, 0, &mut chunk[..read])
                .map_err(jni_error)?;
            bytes.extend(chunk[..read].iter().map(|b| *b as u8));
        }

        env.call_method(&stream, "close", "()V", &[])
            .map_err(jni_error)?;

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(target, &bytes)?;

        debug!(asset = path, bytes = bytes.len(), "asset extracted to cache");
        Ok(())
    }
}

impl ResourceProvider for AndroidAssets {
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        if path.is_empty() {
            return Err(Error::Resource("empty resource path".to_string()));
        }
        let relative = path.trim_start_matches('/');
        let target = self.cache_dir.join(relative);
        if !target.is_file() {
            self.extract(relative, &target)?;
        }
        Ok(target)
    }
}
