/// Prompt preview and one-shot generation
use anyhow::Result;
use nudge_ai::{CompletionProvider, LlamaCppProvider};
use nudge_core::{
    audio::RodioAudio,
    speech::{speak, EdgeTtsCommand},
    MonitorConfig,
};

pub fn punishment(config: &MonitorConfig, window: &str, target: Option<&str>) -> String {
    config.templates().punishment_prompt(window, target)
}

pub fn praise(config: &MonitorConfig, window: &str, seconds: i64) -> String {
    config.templates().praise_prompt(window, seconds)
}

pub async fn handle_prompt(config: &MonitorConfig, prompt: &str, send: bool) -> Result<()> {
    println!("{prompt}");
    if !send {
        return Ok(());
    }

    let provider = LlamaCppProvider::new(
        &config.completion_url,
        config.sampling.clone(),
        config.request_timeout(),
    )?;
    if !provider.is_available().await {
        log::warn!("Completion service at {} is not responding", config.completion_url);
    }

    let text = provider.complete(prompt).await?;
    println!("\n{text}");

    let synthesizer = EdgeTtsCommand::new(&config.tts_command);
    let audio = RodioAudio::new();
    speak(&synthesizer, &audio, &text, &config.edge_tts_voice).await
}
