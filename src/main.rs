mod all;
mod calibration;
mod client;
mod event_loop;
mod features;
mod frame;
mod labels;
mod live;
mod parameters;
mod pipeline;
mod render_sync;
mod shutdown;
mod source;
mod synthetic;
mod targets;
mod transport;
mod types;
mod util;
mod visualize;
mod wire;

use all::*;

#[macro_use] extern crate lazy_static;
use clap::Parser;

use softbuffer::GraphicsContext;
use std::sync::Arc;
use std::time::Duration;
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;
use winit::platform::run_return::EventLoopExtRunReturn;

#[derive(Parser)]
#[clap(about = "Arm swing feedback from motion capture markers")]
struct Args {
  #[clap(subcommand)]
  command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
  /// Read frames from a recording or a capture device and publish them.
  Publish {
    #[clap(long, env = "PUBLISH_BIND", default_value = DEFAULT_BIND)]
    bind: String,
    #[clap(long, default_value = "4")]
    queue_capacity: usize,
    #[clap(subcommand)]
    source: SourceCommand,
  },
  /// Subscribe and draw the arms and swing targets.
  Visualize {
    #[clap(flatten)]
    parameters: ParameterSet,
    /// Log element changes instead of opening a window.
    #[clap(long)]
    headless: bool,
  },
  /// Subscribe, measure the rest pose and save the calibration.
  Calibrate {
    #[clap(flatten)]
    parameters: ParameterSet,
    #[clap(long, default_value = "100")]
    samples: usize,
  },
  /// Write a simulated recording for replay.
  Synthesize {
    #[clap(long)]
    output: PathBuf,
    #[clap(long, default_value = "1000")]
    frames: usize,
    #[clap(long, default_value = "0")]
    seed: u64,
  },
}

#[derive(clap::Subcommand)]
enum SourceCommand {
  Replay {
    #[clap(long)]
    recording: PathBuf,
    #[clap(long, env = "DEMO_FPS", default_value = "40")]
    fps: f64,
    #[clap(long, env = "DEMO_FRAME_STEP", default_value = "5")]
    stride: usize,
  },
  Live {
    #[clap(long, env = "DEVICE_ADDRESS", default_value = DEFAULT_DEVICE)]
    device: String,
    // Seconds.
    #[clap(long, default_value = "5")]
    connect_timeout: f64,
    #[clap(long)]
    labels: Option<String>,
  },
}

fn handle_error(err: &anyhow::Error) {
  eprintln!("Error:");
  for (i, e) in err.chain().enumerate() {
    eprintln!("  {}: {}", i + 1, e);
  }
}

fn main() {
  util::init_logging();
  if let Err(err) = run() {
    handle_error(&err);
    std::process::exit(1);
  }
}

fn run() -> Result<()> {
  let args = Args::parse();
  let shutdown = ShutdownHandle::new();
  shutdown.install_interrupt_handler()?;

  match args.command {
    Command::Publish { bind, queue_capacity, source } => {
      let mut publisher = Publisher::bind(&bind, queue_capacity)?;
      let mut source: Box<dyn FrameSource> = match source {
        SourceCommand::Replay { recording, fps, stride } => {
          Box::new(ReplaySource::open(&recording, fps, stride)?)
        },
        SourceCommand::Live { device, connect_timeout, labels } => {
          if !(connect_timeout.is_finite() && connect_timeout > 0.) {
            bail!("Connect timeout must be a positive number of seconds.");
          }
          let timeout = Duration::from_secs_f64(connect_timeout);
          let connector = TcpDeviceConnector::new(&device, timeout, &shutdown);
          Box::new(LiveSource::connect(Box::new(connector), label_table(labels.as_deref())?, timeout)?)
        },
      };
      publish_all(source.as_mut(), &mut publisher, &shutdown)?;
    },
    Command::Visualize { parameters, headless } => {
      let profile = load_profile(&parameters.calibration_store())?;
      let mut consumer = Consumer::new(&parameters, profile)?;
      info!("Waiting for data on {}.", parameters.endpoint);
      if headless {
        let mut client = match FrameClient::connect(&parameters.endpoint, &shutdown)? {
          Some(client) => client,
          None => return Ok(()),
        };
        consume(&mut client, &mut consumer, &mut LogCanvas::new(), &shutdown)?;
      }
      else {
        let render_interval = interval_from_fps(parameters.render_fps)?;
        run_window(consumer, &parameters.endpoint, &shutdown, render_interval)?;
      }
    },
    Command::Calibrate { parameters, samples } => {
      let labels = parameters.label_table()?;
      let store = parameters.calibration_store();
      info!("Waiting for data on {}. Stand still with the arms hanging.", parameters.endpoint);
      let mut client = match FrameClient::connect(&parameters.endpoint, &shutdown)? {
        Some(client) => client,
        None => {
          info!("Calibration was not saved.");
          return Ok(());
        },
      };
      match collect_calibration(&mut client, &labels, &parameters.axis_remap(), samples, &shutdown)? {
        Some(profile) => {
          info!("Rest pose: {:?}", profile);
          store.save(&profile)?;
        },
        None => info!("Calibration was not saved."),
      }
    },
    Command::Synthesize { output, frames, seed } => {
      let frames = synthetic::synthesize(frames, seed);
      write_recording(&output, &frames)?;
      info!("Wrote {} frames at {} fps to {}.", frames.len(), synthetic::CAPTURE_FPS, output.display());
    },
  }
  Ok(())
}

fn run_window(
  mut consumer: Consumer,
  endpoint: &str,
  shutdown: &ShutdownHandle,
  render_interval: Duration,
) -> Result<()> {
  let size = winit::dpi::PhysicalSize::new(WINDOW_WIDTH as u32, WINDOW_HEIGHT as u32);
  let mut event_loop = EventLoop::with_user_event();
  let window = WindowBuilder::new()
    .with_title(WAITING_STATUS)
    .with_resizable(false)
    .with_min_inner_size(size)
    .with_max_inner_size(size)
    .build(&event_loop)
    .map_err(|err| anyhow!("Failed to open a window: {}", err))?;
  let mut graphics_context = match unsafe { GraphicsContext::new(window) } {
    Ok(x) => x,
    Err(_) => bail!("Failed to create a graphics context for the window."),
  };

  let mailbox = Arc::new(LatestFrame::new());
  let proxy = event_loop.create_proxy();
  let endpoint = endpoint.to_string();
  let subscription = shutdown.clone();
  let connect = move || FrameClient::connect(&endpoint, &subscription);
  let receiver = spawn_receiver(connect, mailbox.clone(), move || {
    // Fails only after the event loop is gone.
    let _ = proxy.send_event(());
  })?;

  let mut canvas = FramebufferCanvas::new(WINDOW_WIDTH, WINDOW_HEIGHT, VIEW_RANGE);
  let mut failure = None;
  {
    let mut args = EventLoopArgs {
      consumer: &mut consumer,
      canvas: &mut canvas,
      mailbox: &mailbox,
      graphics_context: &mut graphics_context,
      shutdown,
      render_interval,
    };
    let failure = &mut failure;
    event_loop.run_return(move |event, _, control_flow| {
      if let Err(err) = handle_event(event, control_flow, &mut args) {
        *failure = Some(err);
        *control_flow = ControlFlow::Exit;
      }
    });
  }

  // Closes the subscription so the receiver thread ends.
  shutdown.request();
  if receiver.join().is_err() {
    warn!("Receiver thread panicked.");
  }
  info!("Processed {} frames, rejected {}, {} replaced before display.",
    consumer.processed_count(), consumer.rejected_count(), mailbox.overwritten_count());
  match failure {
    Some(err) => Err(err),
    None => Ok(()),
  }
}
