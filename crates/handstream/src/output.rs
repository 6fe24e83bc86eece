use std::io::IsTerminal;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use handstream_client::{HandData, PoseMessage};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct PoseOutput<'a> {
    seq: u64,
    source: &'a str,
    left: Option<HandData>,
    right: Option<HandData>,
    sender: Option<String>,
    timestamp: String,
}

/// Print one received pose. `seq` is the number of poses printed so far,
/// starting at 1.
pub fn print_pose(message: &PoseMessage, source: &str, seq: u64, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = PoseOutput {
                seq,
                source,
                left: message.pose.left,
                right: message.pose.right,
                sender: message.sender.map(|addr| addr.to_string()),
                timestamp: now_unix_millis(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["SEQ", "SOURCE", "LEFT", "RIGHT"])
                .add_row(vec![
                    seq.to_string(),
                    source.to_string(),
                    hand_label(message.pose.left),
                    hand_label(message.pose.right),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "#{seq} source={source} left={} right={}",
                hand_label(message.pose.left),
                hand_label(message.pose.right)
            );
        }
    }
}

fn hand_label(hand: Option<HandData>) -> String {
    match hand {
        Some(hand) => format!("({}, {}) pinch={:.2}", hand.x, hand.y, hand.pinch),
        None => "-".to_string(),
    }
}

fn now_unix_millis() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
