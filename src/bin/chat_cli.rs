use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use klimata::client::{ChatSession, FileCapture, PcmBackend, Recorder, RelayClient, SendOutcome};
use klimata::config::ClientConfig;
use klimata::telemetry;

const HELP: &str = "\
Ketik pertanyaan lalu Enter untuk mengirim.
  /image <path>   lampirkan gambar (maks. 2 MB)
  /record <path>  mulai rekaman dari berkas audio
  /stop           selesai merekam
  /clear-image    hapus gambar
  /clear-audio    hapus rekaman
  /quit           keluar";

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init();

    let config = ClientConfig::from_env()?;
    let transport = RelayClient::new(config.worker_url.clone());
    let recorder = Recorder::new(Arc::new(PcmBackend));
    let mut chat = ChatSession::new(transport, config, recorder);

    println!("Chatbot Informasi Bencana & Perubahan Iklim");
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let (command, arg) = line.split_once(' ').unwrap_or((line, ""));
        let arg = arg.trim();

        match command {
            "/quit" => break,
            "/help" => println!("{HELP}"),
            "/image" => match chat.attach_image_file(Path::new(arg)).await {
                Ok(()) => println!("📷 gambar terlampir"),
                Err(err) => eprintln!("Kesalahan: {err}"),
            },
            "/record" => match chat.start_recording(Box::new(FileCapture::new(arg))).await {
                Ok(()) => println!("🎙 merekam... ketik /stop untuk selesai"),
                Err(err) => eprintln!("Kesalahan: {err}"),
            },
            "/stop" => match chat.stop_recording().await {
                Ok(()) if chat.has_audio() => println!("🎙 rekaman siap dikirim"),
                Ok(()) => {}
                Err(err) => eprintln!("Kesalahan: {err}"),
            },
            "/clear-image" => chat.clear_image(),
            "/clear-audio" => chat.clear_audio(),
            _ => {
                chat.set_input(line);
                let before = chat.messages().len();
                if chat.send().await == SendOutcome::Skipped {
                    continue;
                }
                for msg in &chat.messages()[before..] {
                    let who = if msg.role.is_user() { "Anda" } else { "Bot" };
                    println!("[{}] {who}: {}", msg.timestamp, msg.text);
                }
                if let Some(err) = chat.error() {
                    eprintln!("Kesalahan: {err}");
                }
            }
        }
    }

    chat.close().await;
    Ok(())
}
