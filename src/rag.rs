use crate::database::VectorStore;
use crate::embeddings::EmbeddingProvider;
use crate::error::Result;
use crate::llm::ChatModel;
use crate::prompt::PromptInput;
use crate::retriever::Retriever;
use log::{debug, error};
use std::future::Future;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Inputs that end the chat session, compared case-insensitively
pub const EXIT_COMMANDS: [&str; 4] = ["sair", "exit", "quit", "q"];

const RULE_WIDTH: usize = 60;

/// Anything that can answer a single question.
#[allow(async_fn_in_trait)]
pub trait Answerer {
    async fn answer(&self, question: &str) -> Result<String>;
}

/// RAG (Retrieval-Augmented Generation) engine
///
/// Every question runs the full pipeline again: retrieve, build context,
/// render the prompt, call the model. Nothing is cached between questions.
pub struct RagEngine<E, S, M> {
    retriever: Retriever<E, S>,
    model: M,
}

impl<E, S, M> RagEngine<E, S, M>
where
    E: EmbeddingProvider,
    S: VectorStore,
    M: ChatModel,
{
    /// Create a new RAG engine
    pub fn new(retriever: Retriever<E, S>, model: M) -> Self {
        RagEngine { retriever, model }
    }

    pub fn retriever(&self) -> &Retriever<E, S> {
        &self.retriever
    }
}

impl<E, S, M> Answerer for RagEngine<E, S, M>
where
    E: EmbeddingProvider,
    S: VectorStore,
    M: ChatModel,
{
    async fn answer(&self, question: &str) -> Result<String> {
        let results = self.retriever.retrieve(question).await?;

        let input = PromptInput::new(question, &results);
        let prompt = input.render();
        debug!("Rendered prompt with {} context chunks", results.len());

        self.model.complete(&prompt).await
    }
}

/// How the chat loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// The user typed one of [`EXIT_COMMANDS`].
    Command,
    EndOfInput,
    /// `interrupt` resolved while reading or answering.
    Interrupted,
}

pub fn is_exit_command(input: &str) -> bool {
    EXIT_COMMANDS
        .iter()
        .any(|command| input.eq_ignore_ascii_case(command))
}

pub fn print_header<W: Write>(out: &mut W) -> std::io::Result<()> {
    writeln!(out, "\n{}", "=".repeat(RULE_WIDTH))?;
    writeln!(out, "Chat com IA - Sistema de Busca Semântica em PDF")?;
    writeln!(out, "{}", "=".repeat(RULE_WIDTH))?;
    writeln!(out, "\nDigite sua pergunta ou 'sair' para encerrar.\n")
}

/// Run the interactive question loop until the user leaves.
///
/// A failed question is reported and the loop keeps going. `interrupt` is
/// raced against every read and every answer.
pub async fn run_query_loop<A, R, W, I>(
    answerer: &A,
    input: R,
    out: &mut W,
    interrupt: I,
) -> Result<LoopExit>
where
    A: Answerer,
    R: AsyncBufRead + Unpin,
    W: Write,
    I: Future<Output = ()>,
{
    let mut lines = input.lines();
    tokio::pin!(interrupt);

    loop {
        writeln!(out, "{}", "-".repeat(RULE_WIDTH))?;
        write!(out, "\nFaça sua pergunta: ")?;
        out.flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = &mut interrupt => return interrupted(out),
        };

        let Some(line) = line else {
            writeln!(out, "\nEncerrando o chat. Até logo!\n")?;
            return Ok(LoopExit::EndOfInput);
        };

        let question = line.trim();

        if is_exit_command(question) {
            writeln!(out, "\nEncerrando o chat. Até logo!\n")?;
            return Ok(LoopExit::Command);
        }

        if question.is_empty() {
            writeln!(out, "[AVISO] Por favor, digite uma pergunta válida.")?;
            continue;
        }

        writeln!(out, "\nBuscando informações...")?;
        out.flush()?;

        let answer = tokio::select! {
            answer = answerer.answer(question) => answer,
            _ = &mut interrupt => return interrupted(out),
        };

        match answer {
            Ok(answer) => {
                writeln!(out, "\nRESPOSTA:")?;
                writeln!(out, "{}", "-".repeat(RULE_WIDTH))?;
                writeln!(out, "{}\n", answer)?;
            }
            Err(e) => {
                error!("Failed to answer question: {}", e);
                writeln!(out, "\n[ERRO] Erro ao processar a pergunta: {}", e)?;
                writeln!(out, "Tente novamente ou digite 'sair' para encerrar.\n")?;
            }
        }
    }
}

fn interrupted<W: Write>(out: &mut W) -> Result<LoopExit> {
    writeln!(out, "\n\nChat interrompido pelo usuário. Até logo!\n")?;
    Ok(LoopExit::Interrupted)
}
