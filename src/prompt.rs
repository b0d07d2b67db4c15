//! Prompt assembly for grounded answers.
//!
//! The model is told to answer only from the retrieved context and to reply
//! with [`REFUSAL`] whenever the context does not hold the answer.

use crate::database::ScoredResult;

/// Fixed reply for questions the context cannot answer.
pub const REFUSAL: &str = "Não tenho informações necessárias para responder sua pergunta.";

/// Answering template. `{contexto}` receives the retrieved chunks and
/// `{pergunta}` the user's question.
pub const PROMPT_TEMPLATE: &str = r#"CONTEXTO:
{contexto}

REGRAS:
- Responda somente com base no CONTEXTO.
- Se a informação não estiver explicitamente no CONTEXTO, responda:
  "Não tenho informações necessárias para responder sua pergunta."
- Nunca invente ou use conhecimento externo.
- Nunca produza opiniões ou interpretações além do que está escrito.

EXEMPLOS DE PERGUNTAS FORA DO CONTEXTO:
Pergunta: "Qual é a capital da França?"
Resposta: "Não tenho informações necessárias para responder sua pergunta."

Pergunta: "Quantos clientes temos em 2024?"
Resposta: "Não tenho informações necessárias para responder sua pergunta."

Pergunta: "Você acha isso bom ou ruim?"
Resposta: "Não tenho informações necessárias para responder sua pergunta."

PERGUNTA DO USUÁRIO:
{pergunta}

RESPONDA A "PERGUNTA DO USUÁRIO"
"#;

/// Values substituted into [`PROMPT_TEMPLATE`]
#[derive(Debug, Clone, PartialEq)]
pub struct PromptInput {
    pub contexto: String,
    pub pergunta: String,
}

impl PromptInput {
    pub fn new(question: &str, results: &[ScoredResult]) -> Self {
        PromptInput {
            contexto: format_context(results),
            pergunta: question.to_string(),
        }
    }

    pub fn render(&self) -> String {
        render_template(
            PROMPT_TEMPLATE,
            &[("contexto", &self.contexto), ("pergunta", &self.pergunta)],
        )
    }
}

/// Chunk texts in ranked order, each trimmed, separated by a blank line.
/// Scores are dropped.
pub fn format_context(results: &[ScoredResult]) -> String {
    results
        .iter()
        .map(|result| result.chunk.text.trim())
        .collect::<Vec<&str>>()
        .join("\n\n")
}

/// Replace `{name}` placeholders in a single pass, so braces inside the
/// substituted values are never expanded.
fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        rendered.push_str(&rest[..open]);
        let tail = &rest[open + 1..];

        let placeholder = vars.iter().find(|(name, _)| {
            tail.strip_prefix(name)
                .is_some_and(|after| after.starts_with('}'))
        });

        match placeholder {
            Some((name, value)) => {
                rendered.push_str(value);
                rest = &tail[name.len() + 1..];
            }
            None => {
                rendered.push('{');
                rest = tail;
            }
        }
    }

    rendered.push_str(rest);
    rendered
}
