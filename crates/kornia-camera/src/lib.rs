#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # Kornia Camera
//!
//! Read-only camera views consumed by the multi-view line reconstruction.
//!
//! - [`CameraModelId`]: closed set of intrinsic models, dispatched with `match`
//! - [`Camera`]: intrinsic parameters and (un)distortion
//! - [`CameraPose`]: world-to-camera rotation and translation
//! - [`CameraView`]: projection and back-projection through a calibrated camera
//! - [`MinimalPinholeCamera`]: compact encoding used by optimizers
//!
//! ```rust
//! use glam::{DMat3, DVec3};
//! use kornia_camera::{Camera, CameraModelId, CameraPose, CameraView};
//!
//! let cam = Camera::new(CameraModelId::Pinhole, vec![500.0, 500.0, 320.0, 240.0], (640, 480))?;
//! let pose = CameraPose::from_center(&DMat3::IDENTITY, DVec3::new(0.0, 0.0, -5.0));
//! let view = CameraView::new(cam, pose);
//!
//! let uv = view.projection(DVec3::ZERO);
//! assert_eq!(uv.x, 320.0);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod minimal;
mod model;
mod pose;
mod view;

pub use minimal::MinimalPinholeCamera;
pub use model::{Camera, CameraError, CameraModelId};
pub use pose::CameraPose;
pub use view::CameraView;
