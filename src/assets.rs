use crate::cache::AssetCache;
use crate::model::SpriteId;
use crate::render::Pixel;
use image::ImageFormat;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{info, warn};

const PLACEHOLDER_SIZE: u32 = 32;

#[derive(Debug, Error)]
pub(crate) enum AssetError {
    #[error("asset path {0:?} must be relative and stay inside the asset root")]
    BadPath(String),
    #[error("asset {path:?} is neither cached nor readable from the source")]
    Unavailable {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not decode {name:?}")]
    Decode {
        name: String,
        #[source]
        source: image::ImageError,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Straight-alpha RGBA image.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Bitmap {
    pub(crate) w: u32,
    pub(crate) h: u32,
    pub(crate) px: Vec<Pixel>,
}

impl Bitmap {
    pub(crate) fn new(w: u32, h: u32) -> Self {
        Self {
            w,
            h,
            px: vec![Pixel::default(); (w as usize) * (h as usize)],
        }
    }

    pub(crate) fn get(&self, x: u32, y: u32) -> Pixel {
        self.px[(y as usize) * (self.w as usize) + (x as usize)]
    }

    fn put(&mut self, x: i32, y: i32, p: Pixel) {
        if x < 0 || y < 0 || x as u32 >= self.w || y as u32 >= self.h {
            return;
        }
        let i = (y as usize) * (self.w as usize) + (x as usize);
        self.px[i] = p;
    }

    pub(crate) fn decode_png(name: &str, bytes: &[u8]) -> Result<Self, AssetError> {
        let img = image::load_from_memory_with_format(bytes, ImageFormat::Png)
            .map_err(|source| AssetError::Decode {
                name: name.to_string(),
                source,
            })?
            .to_rgba8();
        let (w, h) = img.dimensions();
        let px = img
            .pixels()
            .map(|p| Pixel {
                r: p[0],
                g: p[1],
                b: p[2],
                a: p[3],
            })
            .collect();
        Ok(Self { w, h, px })
    }
}

pub(crate) fn file_name(id: SpriteId) -> &'static str {
    match id {
        SpriteId::IdleLeft => "pig-left.png",
        SpriteId::IdleRight => "pig-right.png",
        SpriteId::SleepLeft => "pig-sleep.png",
        SpriteId::SleepRight => "pig-sleepR.png",
    }
}

/// The pet images. Every pose has at least one facing; the other facing may
/// be served as a horizontal mirror.
pub(crate) struct SpriteSheet {
    images: HashMap<SpriteId, Bitmap>,
}

impl SpriteSheet {
    /// Image to draw for `id` and whether it has to be mirrored.
    pub(crate) fn resolve(&self, id: SpriteId) -> (&Bitmap, bool) {
        match self.images.get(&id) {
            Some(img) => (img, false),
            None => (&self.images[&id.mirrored()], true),
        }
    }

    pub(crate) fn placeholder() -> Self {
        Self::from_partial(HashMap::new())
    }

    /// A pose with neither facing loaded gets drawn placeholders.
    pub(crate) fn from_partial(mut images: HashMap<SpriteId, Bitmap>) -> Self {
        let loaded: Vec<SpriteId> = images.keys().copied().collect();
        for id in SpriteId::ALL {
            if !loaded.contains(&id) && !loaded.contains(&id.mirrored()) {
                images.insert(id, placeholder_pig(id));
            }
        }
        Self { images }
    }

    /// Pulls every sprite through the cache. Failures degrade to fallbacks
    /// and are logged; this never aborts startup.
    pub(crate) fn load(cache: &AssetCache) -> Self {
        let mut images = HashMap::new();
        for id in SpriteId::ALL {
            let name = file_name(id);
            let decoded = cache
                .fetch(name)
                .and_then(|bytes| Bitmap::decode_png(name, &bytes));
            match decoded {
                Ok(img) => {
                    info!(sprite = name, w = img.w, h = img.h, "sprite loaded");
                    images.insert(id, img);
                }
                Err(e) => warn!(sprite = name, error = %e, "sprite unavailable, using fallback"),
            }
        }
        Self::from_partial(images)
    }
}

/// A pink blob with a snout on the facing side; closed eye and a "z" when asleep.
fn placeholder_pig(id: SpriteId) -> Bitmap {
    let n = PLACEHOLDER_SIZE as i32;
    let mut img = Bitmap::new(PLACEHOLDER_SIZE, PLACEHOLDER_SIZE);
    let body = Pixel {
        r: 246,
        g: 166,
        b: 190,
        a: 255,
    };
    let snout = Pixel {
        r: 232,
        g: 120,
        b: 150,
        a: 255,
    };
    let ink = Pixel {
        r: 30,
        g: 20,
        b: 30,
        a: 255,
    };

    let (cx, cy) = (n / 2, n / 2 + 3);
    let (rx, ry) = (n / 2 - 3, n / 2 - 6);
    for y in 0..n {
        for x in 0..n {
            let dx = (x - cx) as f32 / rx as f32;
            let dy = (y - cy) as f32 / ry as f32;
            if dx * dx + dy * dy <= 1.0 {
                img.put(x, y, body);
            }
        }
    }
    // legs
    for leg in [cx - rx / 2 - 1, cx + rx / 2] {
        for y in cy + ry - 1..n {
            img.put(leg, y, body);
            img.put(leg + 1, y, body);
        }
    }

    let dir = id.facing().sign() as i32;
    let snout_x = cx + dir * (rx - 1);
    for y in cy - 2..=cy + 1 {
        for x in snout_x - 2..=snout_x + 2 {
            img.put(x, y, snout);
        }
    }
    img.put(snout_x - 1, cy - 1, ink);
    img.put(snout_x + 1, cy - 1, ink);

    let eye_x = cx + dir * (rx / 3);
    let eye_y = cy - ry / 2;
    match id {
        SpriteId::IdleLeft | SpriteId::IdleRight => {
            img.put(eye_x, eye_y, ink);
            img.put(eye_x, eye_y + 1, ink);
        }
        SpriteId::SleepLeft | SpriteId::SleepRight => {
            for dx in -1..=1 {
                img.put(eye_x + dx, eye_y + 1, ink);
            }
            let zx = cx - dir * (rx / 2);
            for dx in 0..4 {
                img.put(zx + dx, 1, ink);
                img.put(zx + dx, 4, ink);
                img.put(zx + 3 - dx, 1 + dx, ink);
            }
        }
    }
    img
}
