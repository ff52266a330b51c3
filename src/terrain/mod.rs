// 地形生成模块

pub mod error;
pub mod executor;
pub mod heightmap;
pub mod image_source;
pub mod noise;
pub mod ops;
pub mod parameters;
pub mod settings;

pub use self::error::*;
pub use self::executor::*;
pub use self::heightmap::*;
pub use self::image_source::*;
pub use self::noise::*;
pub use self::ops::*;
pub use self::parameters::*;
pub use self::settings::*;
