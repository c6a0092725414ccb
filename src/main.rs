//! Native demo: floats the logos of a JSON config in a window.

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::time::{SystemTime, UNIX_EPOCH};

    use anyhow::{Context, Result, bail};
    use floatlogos::{
        app::{App, Overlay},
        config::{FloatingLogosConfig, HostHints},
        loader::LoadReport,
    };
    use log::info;
    use winit::event_loop::{ControlFlow, EventLoop};

    const USAGE: &str =
        "usage: floatlogos <config.json> [--reduced-motion] [--font <file.ttf>] [--words a,b,c]";

    struct Args {
        config: String,
        reduced_motion: bool,
        font: Option<String>,
        words: Vec<String>,
    }

    fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args> {
        let mut config = None;
        let mut reduced_motion = false;
        let mut font = None;
        let mut words = vec![];
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--reduced-motion" => reduced_motion = true,
                "--font" => font = Some(args.next().context("--font needs a path")?),
                "--words" => {
                    let list = args.next().context("--words needs a list")?;
                    words = list
                        .split(',')
                        .map(|w| w.trim().to_string())
                        .filter(|w| !w.is_empty())
                        .collect();
                }
                "-h" | "--help" => bail!(USAGE),
                _ if config.is_none() => config = Some(arg),
                _ => bail!("unexpected argument {arg:?}\n{USAGE}"),
            }
        }
        Ok(Args {
            config: config.context(USAGE)?,
            reduced_motion,
            font,
            words,
        })
    }

    pub fn main() -> Result<()> {
        env_logger::init();
        let args = parse_args(std::env::args().skip(1))?;

        let text = std::fs::read_to_string(&args.config)
            .with_context(|| format!("reading {}", args.config))?;
        let config = FloatingLogosConfig::from_json(&text)
            .with_context(|| format!("parsing {}", args.config))?;
        let font = args
            .font
            .as_deref()
            .map(std::fs::read)
            .transpose()
            .context("reading font")?;

        let seed = config.seed.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or_default()
        });
        let hints = HostHints {
            prefers_reduced_motion: args.reduced_motion,
            ..Default::default()
        };
        info!("starting with {} logos", config.logos.len());

        let event_loop = EventLoop::<LoadReport>::with_user_event().build()?;
        // The animation drives itself through redraw requests.
        event_loop.set_control_flow(ControlFlow::Wait);
        let overlay = Overlay {
            font,
            words: args.words,
        };
        let mut app = App::new(config, hints, overlay, event_loop.create_proxy(), seed);
        event_loop.run_app(&mut app)?;
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    native::main()
}

#[cfg(target_arch = "wasm32")]
fn main() {}
