#[macro_use]
extern crate tracing;

use anyhow::Context;
use pixelpost::{CancelToken, Client, DEFAULT_BASE_URL, Order, PictureSource, UploadOptions};
use std::{
    env,
    path::PathBuf,
    thread,
    time::{Duration, Instant},
};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

const TOKEN_VAR: &str = "PIXELS_TOKEN";

#[derive(argh::FromArgs)]
/// Draw on the shared pixel canvas without tripping its rate limits
struct Args {
    #[argh(option)]
    /// api token, read from $PIXELS_TOKEN when omitted
    token: Option<String>,

    #[argh(option, default = "DEFAULT_BASE_URL.to_owned()")]
    /// base URL of the canvas API
    base_url: String,

    #[argh(option, default = "30")]
    /// request timeout in seconds
    timeout: u64,

    #[argh(switch)]
    /// print the known rate limits once the command is done
    show_limits: bool,

    #[argh(subcommand)]
    command: Command,
}

#[derive(argh::FromArgs)]
#[argh(subcommand)]
enum Command {
    Size(SizeArgs),
    GetPixel(GetPixelArgs),
    SetPixel(SetPixelArgs),
    Canvas(CanvasArgs),
    Picture(PictureArgs),
}

#[derive(argh::FromArgs)]
#[argh(subcommand, name = "size")]
/// print the canvas size
struct SizeArgs {}

#[derive(argh::FromArgs)]
#[argh(subcommand, name = "get-pixel")]
/// print the color of a pixel
struct GetPixelArgs {
    #[argh(positional)]
    /// x coordinate
    x: i64,

    #[argh(positional)]
    /// y coordinate
    y: i64,
}

#[derive(argh::FromArgs)]
#[argh(subcommand, name = "set-pixel")]
/// paint a single pixel
struct SetPixelArgs {
    #[argh(positional)]
    /// x coordinate
    x: i64,

    #[argh(positional)]
    /// y coordinate
    y: i64,

    #[argh(positional)]
    /// color as RRGGBB hex
    color: String,

    #[argh(switch)]
    /// write even if the pixel already has the color
    force: bool,
}

#[derive(argh::FromArgs)]
#[argh(subcommand, name = "canvas")]
/// download the whole canvas as an image
struct CanvasArgs {
    #[argh(option)]
    /// path of the image to write, format picked by extension
    output: PathBuf,

    #[argh(option, default = "1")]
    /// integer upscaling factor
    scale: i64,
}

#[derive(argh::FromArgs)]
#[argh(subcommand, name = "picture")]
/// draw an image file or URL onto the canvas
struct PictureArgs {
    #[argh(positional)]
    /// path or http(s) URL of the image
    source: String,

    #[argh(option, default = "0")]
    /// x offset
    x_offset: i64,

    #[argh(option, default = "0")]
    /// y offset
    y_offset: i64,

    #[argh(switch)]
    /// draw rows in random order
    shuffle: bool,

    #[argh(option)]
    /// stop the upload after this many seconds
    deadline: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let args: Args = argh::from_env();

    let token = args
        .token
        .or_else(|| env::var(TOKEN_VAR).ok())
        .with_context(|| format!("no API token, pass --token or set {TOKEN_VAR}"))?;

    let force = matches!(&args.command, Command::SetPixel(set) if set.force);
    let mut client = Client::builder(token)
        .base_url(args.base_url)
        .timeout(Duration::from_secs(args.timeout))
        .skip_unchanged(!force)
        .build()?;

    match args.command {
        Command::Size(SizeArgs {}) => {
            let size = client.size()?;
            println!("{}x{}", size.width, size.height);
        }
        Command::GetPixel(GetPixelArgs { x, y }) => {
            println!("{}", client.get_pixel(x, y)?);
        }
        Command::SetPixel(SetPixelArgs { x, y, color, .. }) => {
            let outcome = client.set_pixel(x, y, color.as_str())?;
            info!(x, y, ?outcome, "set pixel");
        }
        Command::Canvas(CanvasArgs { output, scale }) => {
            let canvas = client.canvas(scale)?;
            canvas
                .save(&output)
                .with_context(|| format!("failed to write {}", output.display()))?;
            info!(path = %output.display(), width = canvas.width(), height = canvas.height(), "saved canvas");
        }
        Command::Picture(picture) => {
            let options = UploadOptions {
                order: if picture.shuffle {
                    Order::Shuffled
                } else {
                    Order::RowMajor
                },
                cancel: CancelToken::new(),
            };

            if let Some(deadline) = picture.deadline {
                let cancel = options.cancel.clone();
                thread::spawn(move || {
                    thread::sleep(Duration::from_secs(deadline));
                    info!("deadline reached, stopping after the current pixel");
                    cancel.cancel();
                });
            }

            let report = client.set_picture(
                picture.x_offset,
                picture.y_offset,
                PictureSource::parse(&picture.source),
                &options,
            )?;
            println!(
                "written: {}, unchanged: {}, transparent: {}{}",
                report.written,
                report.unchanged,
                report.transparent,
                if report.cancelled { " (cancelled)" } else { "" }
            );
        }
    }

    if args.show_limits {
        let now = Instant::now();
        for (endpoint, state) in client.limits() {
            println!(
                "{endpoint}: {} remaining, resets in {:.1}s",
                state.remaining,
                state.reset_in(now).as_secs_f64()
            );
        }
    }

    Ok(())
}
