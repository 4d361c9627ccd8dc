// SPDX-License-Identifier: MIT
//
// The chat loop.
//
// The session opens with the preface, then the intro message is answered
// without being shown. After that, one iteration per prompt: read a line on
// the background reader, then act on what came back.
//
//   Line      → scroll the screen away, stream the reply under the loader
//   Retry     → un-type the last reply, stream a new one for the same request
//   Edit      → un-type the last reply, re-prompt with its message pre-filled
//   Continue  → scroll away, stream more without new input
//   Exit/EOF  → leave
//
// The screen only ever holds the latest exchange, plus the preface while the
// intro reply is the latest. Every rendered reply is kept as its (raw,
// styled) pair so that screen can be rebuilt after a reverse animation has
// cleared it.

use std::io;

use cl_anim::reverse::ReverseStreamer;
use cl_anim::{AnimError, Coordinator, DotLoader, Scroller, Signal};
use cl_style::Preface;
use cl_term::line::{EditorConfig, LineError, LineResult};
use cl_term::reader::LineReader;
use futures::stream::LocalBoxStream;
use futures::{Stream, StreamExt};
use thiserror::Error;

use crate::config::Settings;
use crate::producer;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error(transparent)]
    Line(#[from] LineError),
    #[error(transparent)]
    Anim(#[from] AnimError),
    #[error("terminal I/O failed: {0}")]
    Io(#[from] io::Error),
}

/// What a reply answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// The opening message, sent without being shown.
    Intro(String),
    /// A message the user typed.
    Message(String),
    /// More of the previous reply.
    Continue,
}

/// One request and the reply rendered for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub request: Request,
    pub raw: String,
    pub styled: String,
}

pub struct Chat {
    coordinator: Coordinator,
    reverse: ReverseStreamer,
    scroller: Scroller,
    prompt: String,
    editor: EditorConfig,
    preface: Preface,
    /// The preface as rendered at startup.
    preface_styled: String,
    intro: Option<String>,
    history: Vec<Exchange>,
    /// Replies generated for the last request, retries included.
    attempts: u32,
}

impl Chat {
    pub fn new(coordinator: Coordinator, settings: &Settings) -> Self {
        Self {
            coordinator,
            reverse: settings.reverse,
            scroller: settings.scroller,
            prompt: settings.prompt.clone(),
            editor: settings.editor.clone(),
            preface: settings.preface.clone(),
            preface_styled: String::new(),
            intro: settings.intro.clone(),
            history: Vec::new(),
            attempts: 0,
        }
    }

    #[cfg(test)]
    pub fn history(&self) -> &[Exchange] {
        &self.history
    }

    /// Show the preface and answer the intro message.
    async fn open(&mut self) -> Result<(), ChatError> {
        let width = usize::from(self.coordinator.display().width());
        self.preface_styled = self.preface.render(self.coordinator.engine_mut(), width);
        if !self.preface_styled.is_empty() {
            self.coordinator
                .display()
                .animated_update(&self.preface_styled, None, None)?;
        }
        if let Some(intro) = self.intro.clone() {
            self.attempts = 1;
            let reply = producer::intro(&intro, self.attempts);
            self.respond(Request::Intro(intro), reply).await?;
        }
        Ok(())
    }

    /// Prompt until the user leaves.
    pub async fn run(&mut self) -> Result<(), ChatError> {
        self.open().await?;
        let mut draft: Option<String> = None;

        loop {
            let reader = LineReader::spawn(self.prompt.clone(), draft.take(), self.editor.clone());
            match reader.result().await {
                Ok(LineResult::Line(text)) => self.send(Request::Message(text)).await?,
                Ok(LineResult::Continue) => self.send(Request::Continue).await?,
                Ok(LineResult::Retry) => {
                    if let Some(last) = self.retract().await? {
                        self.regenerate(last.request).await?;
                    }
                }
                Ok(LineResult::Edit) => {
                    if let Some(last) = self.retract().await? {
                        match last.request {
                            Request::Message(text) => {
                                self.redraw()?;
                                draft = Some(text);
                            }
                            other => self.regenerate(other).await?,
                        }
                    }
                }
                Ok(LineResult::Exit) | Err(LineError::Eof | LineError::Interrupted) => break,
                Err(e) => return Err(e.into()),
            }
        }

        log::info!("session ended after {} exchanges", self.history.len());
        Ok(())
    }

    /// A fresh request from the prompt: scroll the screen away, then reply.
    async fn send(&mut self, request: Request) -> Result<(), ChatError> {
        let prompt = self.loader_prompt(&request);
        if let Some(prompt) = prompt.filter(|_| self.coordinator.config().enabled) {
            let screen = self.screen();
            self.scroller
                .run(self.coordinator.display(), &screen, &prompt)
                .await?;
        }
        self.attempts = 1;
        let reply = self.produce(&request);
        self.respond(request, reply).await
    }

    /// Reply to `request` again after it was retracted.
    async fn regenerate(&mut self, request: Request) -> Result<(), ChatError> {
        if !matches!(request, Request::Intro(_)) {
            // Start the loader at the top, where the scroll left it.
            self.coordinator.display().animated_update("", None, None)?;
        }
        self.attempts += 1;
        let reply = self.produce(&request);
        self.respond(request, reply).await
    }

    fn produce(&self, request: &Request) -> LocalBoxStream<'static, String> {
        match request {
            Request::Intro(intro) => producer::intro(intro, self.attempts).boxed_local(),
            Request::Message(text) => producer::reply(text, self.attempts).boxed_local(),
            Request::Continue => {
                let previous = self.history.last().map_or("", |e| e.raw.as_str());
                producer::continuation(previous, self.history.len()).boxed_local()
            }
        }
    }

    /// The loader line for `request`. The intro has none.
    fn loader_prompt(&self, request: &Request) -> Option<String> {
        match request {
            Request::Intro(_) => None,
            Request::Message(text) => Some(format!("{}{text}", self.prompt)),
            Request::Continue => Some(self.prompt.clone()),
        }
    }

    /// The loader line as it is left once the reply starts.
    fn header(&self, request: &Request) -> Option<String> {
        self.loader_prompt(request)
            .map(|prompt| DotLoader::new(&prompt, true).final_frame())
    }

    /// What the screen holds: the last exchange under its loader line, or
    /// under the preface when it answered the intro.
    fn screen(&self) -> String {
        let Some(last) = self.history.last() else {
            return self.preface_styled.clone();
        };
        match self.header(&last.request) {
            Some(header) => format!("{header}\n\n{}", last.styled),
            None => format!("{}{}", self.preface_styled, last.styled),
        }
    }

    /// Render a reply to `request`. Ctrl-C stops it; an interrupted reply is
    /// not kept.
    async fn respond<S>(&mut self, request: Request, reply: S) -> Result<(), ChatError>
    where
        S: Stream<Item = String>,
    {
        let loader_prompt = self.loader_prompt(&request);
        let cancel = Signal::new();
        let outcome = {
            let coordinator = &mut self.coordinator;
            let cancel = &cancel;
            let run = async move {
                match loader_prompt {
                    Some(prompt) => coordinator.run_with_cancel(&prompt, reply, cancel).await,
                    None => coordinator.run_silent(reply, cancel).await,
                }
            };
            tokio::pin!(run);
            tokio::select! {
                result = &mut run => result,
                _ = tokio::signal::ctrl_c() => {
                    cancel.fire();
                    run.await
                }
            }
        };

        match outcome {
            Ok((raw, styled)) => {
                self.history.push(Exchange {
                    request,
                    raw,
                    styled,
                });
                Ok(())
            }
            Err(AnimError::Interrupted) => {
                log::info!("reply interrupted");
                self.coordinator.display().write("\n")?;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Take back the last reply and animate it away. The intro reply goes
    /// with the preface kept above it; any other keeps its loader line.
    async fn retract(&mut self) -> Result<Option<Exchange>, ChatError> {
        let Some(last) = self.history.pop() else {
            return Ok(None);
        };
        let display = self.coordinator.display();
        match self.header(&last.request) {
            Some(header) => {
                self.reverse
                    .run(display, &last.styled, Some(&header), None)
                    .await?;
            }
            None => {
                let prefix = Some(self.preface_styled.as_str()).filter(|p| !p.is_empty());
                let screen = format!("{}{}", self.preface_styled, last.styled);
                self.reverse.run(display, &screen, None, prefix).await?;
            }
        }
        Ok(Some(last))
    }

    /// Clear the screen and rewrite what it held before the last exchange.
    fn redraw(&self) -> io::Result<()> {
        self.coordinator
            .display()
            .animated_update(&self.screen(), None, None)
    }
}
