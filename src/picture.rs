use crate::{
    client::{Client, WriteOutcome},
    error::{Error, Result},
};
use image::{DynamicImage, RgbImage, RgbaImage};
use itertools::Itertools;
use pixelpost_common::{Pixel, PixelColor};
use rand::seq::SliceRandom;
use std::{
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

const PROGRESS_EVERY: usize = 100;

/// Where the pixels of an upload come from.
#[derive(Clone, Debug)]
pub enum PictureSource {
    Path(PathBuf),
    /// Direct `http(s)://` link to an image file.
    Url(String),
    Image(DynamicImage),
}

impl PictureSource {
    /// URLs are recognised by their scheme, everything else is a path.
    pub fn parse(source: &str) -> Self {
        if source.starts_with("http://") || source.starts_with("https://") {
            Self::Url(source.to_owned())
        } else {
            Self::Path(source.into())
        }
    }

    fn load(self, http: &reqwest::blocking::Client) -> Result<RgbaImage> {
        let image = match self {
            Self::Path(path) => {
                info!(path = %path.display(), "loading picture");
                image::open(&path)
                    .map_err(|err| Error::InvalidImage(format!("{}: {err}", path.display())))?
            }
            Self::Url(url) => {
                info!(%url, "downloading picture");
                let response = http
                    .get(&url)
                    .send()
                    .map_err(|err| Error::InvalidImage(format!("{url}: {err}")))?;

                let status = response.status();
                if !status.is_success() {
                    return Err(Error::InvalidImage(format!("{url}: server returned {status}")));
                }

                let bytes = response
                    .bytes()
                    .map_err(|err| Error::InvalidImage(format!("{url}: {err}")))?;
                image::load_from_memory(&bytes)
                    .map_err(|err| Error::InvalidImage(format!("{url}: {err}")))?
            }
            Self::Image(image) => image,
        };

        // sources without alpha come out fully opaque
        Ok(image.into_rgba8())
    }
}

impl From<PathBuf> for PictureSource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for PictureSource {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_owned())
    }
}

impl From<DynamicImage> for PictureSource {
    fn from(image: DynamicImage) -> Self {
        Self::Image(image)
    }
}

impl From<RgbaImage> for PictureSource {
    fn from(image: RgbaImage) -> Self {
        Self::Image(image.into())
    }
}

impl From<RgbImage> for PictureSource {
    fn from(image: RgbImage) -> Self {
        Self::Image(image.into())
    }
}

/// Shared flag that stops a running upload before its next pixel.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Order in which picture pixels are visited.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Order {
    #[default]
    RowMajor,
    /// Rows in random order, each row left to right.
    Shuffled,
}

#[derive(Clone, Debug, Default)]
pub struct UploadOptions {
    pub order: Order,
    pub cancel: CancelToken,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UploadReport {
    pub written: usize,
    pub unchanged: usize,
    /// Fully transparent pixels, never sent.
    pub transparent: usize,
    /// The upload stopped early because its token was cancelled.
    pub cancelled: bool,
}

impl UploadReport {
    pub fn visited(&self) -> usize {
        self.written + self.unchanged + self.transparent
    }
}

impl Client {
    /// Draw a picture with its top-left corner at `(ox, oy)`.
    ///
    /// Every pixel costs one read and at most one write, each waiting for
    /// quota, so this can run for a long time. Cancelling `options.cancel`
    /// stops it between two pixels; whatever was drawn until then stays.
    pub fn set_picture(
        &mut self,
        ox: i64,
        oy: i64,
        source: impl Into<PictureSource>,
        options: &UploadOptions,
    ) -> Result<UploadReport> {
        let picture = source.into().load(self.http())?;
        let (width, height) = picture.dimensions();

        let size = self.size()?;
        let out_of_bounds = |x, y| Error::OutOfBounds {
            x,
            y,
            width: size.width,
            height: size.height,
        };
        if ox < 0 || oy < 0 {
            return Err(out_of_bounds(ox, oy));
        }
        match ox
            .checked_add(i64::from(width))
            .zip(oy.checked_add(i64::from(height)))
        {
            Some((far_x, far_y))
                if far_x <= i64::from(size.width) && far_y <= i64::from(size.height) => {}
            Some((far_x, far_y)) => return Err(out_of_bounds(far_x - 1, far_y - 1)),
            None => return Err(out_of_bounds(ox, oy)),
        }

        // both offsets were checked against the u32 canvas size
        let (ox, oy) = (ox as u32, oy as u32);

        let mut rows: Vec<u32> = (0..height).collect();
        if options.order == Order::Shuffled {
            rows.shuffle(&mut rand::thread_rng());
        }

        info!(width, height, ox, oy, "uploading picture");
        let mut report = UploadReport::default();
        for (y, x) in rows.into_iter().cartesian_product(0..width) {
            if options.cancel.is_cancelled() {
                info!(visited = report.visited(), "upload cancelled");
                report.cancelled = true;
                break;
            }

            let [r, g, b, alpha] = picture.get_pixel(x, y).0;
            if alpha == 0 {
                report.transparent += 1;
                continue;
            }

            let pixel = Pixel {
                x: ox + x,
                y: oy + y,
                color: PixelColor::from_rgb([r, g, b]),
            };
            match self.write_if_changed(pixel) {
                Ok(WriteOutcome::Written) => report.written += 1,
                Ok(WriteOutcome::Unchanged) => report.unchanged += 1,
                Err(err) => {
                    warn!(
                        written = report.written,
                        unchanged = report.unchanged,
                        transparent = report.transparent,
                        error = %err,
                        "upload interrupted, pixels drawn so far stay"
                    );
                    return Err(err);
                }
            }

            if report.visited() % PROGRESS_EVERY == 0 {
                info!(
                    visited = report.visited(),
                    total = width as usize * height as usize,
                    "upload progress"
                );
            }
        }

        info!(
            written = report.written,
            unchanged = report.unchanged,
            transparent = report.transparent,
            "upload finished"
        );

        Ok(report)
    }
}
