use std::sync::Arc;

use clap::Parser;

use canvasgen::canvas::HttpCanvasClient;
use canvasgen::config::Config;
use canvasgen::pipeline::Pipeline;
use canvasgen::placement::{ParentWidget, WidgetLocation, WidgetSize};

/// Generate an AI image from a prompt and place it on the canvas next to the
/// widget that triggered it.
#[derive(Parser)]
#[command(name = "canvasgen")]
struct Args {
    /// Image generation prompt
    prompt: String,

    /// Id of the widget that triggered the generation
    #[arg(long, default_value = "cli")]
    parent_id: String,

    #[arg(long, default_value_t = 0.0)]
    parent_x: f64,

    #[arg(long, default_value_t = 0.0)]
    parent_y: f64,

    #[arg(long, default_value_t = 400.0)]
    parent_width: f64,

    #[arg(long, default_value_t = 300.0)]
    parent_height: f64,

    #[arg(long, default_value_t = 1.0)]
    parent_scale: f64,

    #[arg(long, default_value_t = 0.0)]
    parent_depth: f64,

    /// Keep the downloaded artifact instead of deleting it after upload
    #[arg(long)]
    keep_artifact: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    Config::dotenv_load();
    let config = Config::new();
    let args = Args::parse();

    let canvas_http = config
        .http_client(config.ai_timeout)
        .expect("Failed to build HTTP client");
    let canvas = Arc::new(
        HttpCanvasClient::new(
            canvas_http,
            config.canvus_server.clone(),
            config.canvus_api_key.clone(),
            config.canvas_id.clone(),
        )
        .expect("Failed to configure canvas client"),
    );

    let mut pipeline =
        Pipeline::from_config(&config, canvas).expect("Failed to assemble pipeline");
    if args.keep_artifact {
        let mut cfg = pipeline.config().clone();
        cfg.cleanup_temp_files = false;
        pipeline = pipeline.with_config(cfg);
    }

    let parent = ParentWidget {
        id: args.parent_id,
        location: WidgetLocation {
            x: args.parent_x,
            y: args.parent_y,
        },
        size: WidgetSize {
            width: args.parent_width,
            height: args.parent_height,
        },
        scale: args.parent_scale,
        depth: args.parent_depth,
    };

    match pipeline.generate(&args.prompt, &parent).await {
        Ok(result) => {
            println!("created widget {}", result.widget_id);
            if args.keep_artifact {
                println!("artifact: {}", result.image_path.display());
            }
        }
        Err(err) => {
            tracing::error!("{err}");
            std::process::exit(1);
        }
    }
}
