//! Interactive console loop

use coda_chat::ConversationService;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{error, info};

const BANNER: &str = "Chat with Claude (use 'ctrl-c' to quit)";
const USER_PROMPT: &str = "\u{1b}[94mYou\u{1b}[0m: ";
const ASSISTANT_LABEL: &str = "\u{1b}[95mClaude\u{1b}[0m: ";
const REPLY_START: &str = "\u{1b}[92m";
const ERROR_START: &str = "\u{1b}[91m";
const RESET: &str = "\u{1b}[0m";

/// Read lines until an empty line or end of input, answering each one.
///
/// A failed turn is reported and the loop continues with history intact.
pub async fn run<R, W>(mut conversation: ConversationService, mut input: R, mut output: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    info!(session = %conversation.session_id(), "Console session started");
    output.write_all(format!("{}\n", BANNER).as_bytes()).await?;

    let mut line = String::new();
    loop {
        output.write_all(USER_PROMPT.as_bytes()).await?;
        output.flush().await?;

        line.clear();
        if input.read_line(&mut line).await? == 0 {
            break;
        }
        let user_input = line.trim_end_matches(['\r', '\n']);
        if user_input.is_empty() {
            break;
        }

        match conversation.send_message(user_input).await {
            Ok(reply) if reply.is_empty() => {}
            Ok(reply) => {
                let text = format!("{}{}{}{}\n", ASSISTANT_LABEL, REPLY_START, reply, RESET);
                output.write_all(text.as_bytes()).await?;
            }
            Err(err) => {
                error!(session = %conversation.session_id(), error = %err, "Turn failed");
                let text = format!("{}Error: {}{}\n", ERROR_START, err, RESET);
                output.write_all(text.as_bytes()).await?;
            }
        }
    }

    output.flush().await?;
    info!(
        session = %conversation.session_id(),
        turns = conversation.history().len(),
        "Console session ended"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use coda_chat::ConversationConfig;
    use coda_core::{Error, Result};
    use coda_llm::{ModelProvider, ModelRequest, ModelResponse};
    use std::sync::{Arc, Mutex};

    /// Echoes the last user turn, failing on the word "fail".
    struct EchoProvider {
        seen: Mutex<usize>,
    }

    #[async_trait]
    impl ModelProvider for EchoProvider {
        async fn send_message(&self, request: ModelRequest) -> Result<ModelResponse> {
            *self.seen.lock().unwrap() = request.messages.len();
            let last = request.messages.last().map(|m| m.content.clone()).unwrap_or_default();
            if last == "fail" {
                return Err(Error::provider(
                    "echo",
                    std::io::Error::new(std::io::ErrorKind::Other, "backend down"),
                ));
            }
            if last == "quiet" {
                return Ok(ModelResponse::text(""));
            }
            Ok(ModelResponse::text(format!("echo {}", last)))
        }

        fn provider_name(&self) -> &str {
            "echo"
        }

        fn model(&self) -> &str {
            "echo-1"
        }
    }

    fn conversation(provider: Arc<EchoProvider>) -> ConversationService {
        ConversationService::without_tools(provider, ConversationConfig::default())
    }

    async fn run_script(script: &str) -> (String, Arc<EchoProvider>) {
        let provider = Arc::new(EchoProvider { seen: Mutex::new(0) });
        let mut output = Vec::new();
        run(conversation(provider.clone()), script.as_bytes(), &mut output)
            .await
            .unwrap();
        (String::from_utf8(output).unwrap(), provider)
    }

    #[tokio::test]
    async fn test_replies_are_labelled_and_coloured() {
        let (output, _) = run_script("hello\n\n").await;
        assert!(output.starts_with(BANNER));
        assert!(output.contains("\u{1b}[95mClaude\u{1b}[0m: \u{1b}[92mecho hello\u{1b}[0m\n"));
        assert_eq!(output.matches(USER_PROMPT).count(), 2);
    }

    #[tokio::test]
    async fn test_errors_do_not_end_the_session() {
        let (output, provider) = run_script("fail\nagain\n").await;
        assert!(output.contains("backend down"));
        assert!(output.contains("echo again"));
        // "fail" stays in history, so the second request carries both user turns.
        assert_eq!(*provider.seen.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_empty_replies_print_nothing() {
        let (output, _) = run_script("quiet\n").await;
        assert!(!output.contains(ASSISTANT_LABEL));
    }

    #[tokio::test]
    async fn test_end_of_input_stops_the_loop() {
        let (output, provider) = run_script("").await;
        assert_eq!(output, format!("{}\n{}", BANNER, USER_PROMPT));
        assert_eq!(*provider.seen.lock().unwrap(), 0);
    }
}
