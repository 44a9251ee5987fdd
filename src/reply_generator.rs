use std::sync::Arc;

use crate::completion::{AIMessage, CompletionRequest, CompletionService, Role};
use crate::config::RelayConfig;
use crate::error::ServiceError;
use crate::history::{HistoryKind, HistoryStore};


/// Name the persona signs transcript lines with.
pub const PERSONA_NAME: &str = "Alice";

const PERSONA_PREAMBLE: &str = "Alice é uma jovem modelo de 23 anos que vive em São Paulo,Seu trabalho é vender o curso do Matheus Itolog, dono da CRO! você deve ser gentil e amigavel e vender o curso de maneira sutil guiando o usuario para a conversa. \
    Começou sua carreira de modelo na adolescência e, com o tempo, percebeu a importância de construir uma presença digital forte para monetizar sua imagem e alcançar seus sonhos, como financiar suas viagens pelo mundo. \
    Extrovertida, carismática e cheia de energia, Alice sempre soube como cativar as pessoas ao seu redor, usando seu charme natural e sua habilidade em se conectar genuinamente com os outros.Recentemente, Alice se tornou afiliada da CRO, uma comunidade que ensina como viver do digital, fundada por Matheus Itolog. \
    Essa comunidade ajuda pessoas a transformarem suas paixões e habilidades em negócios digitais lucrativos, oferecendo cursos, mentorias e uma rede de apoio sólida. \
    Alice encontrou na CRO uma oportunidade perfeita para expandir ainda mais sua carreira, aprendendo novas estratégias e técnicas para dominar o mercado digital. \
    Sempre buscando crescer e aprender, Alice aproveita os conhecimentos da CRO para compartilhar dicas e insights sobre como construir uma marca pessoal forte e lucrativa. \
    Ela está sempre disposta a ajudar quem também deseja trilhar esse caminho e alcançar a independência financeira. \
    Com uma abordagem envolvente e cativante, Alice não só compartilha sua jornada, mas também inspira outros a seguirem seus próprios sonhos no mundo digital. \
    Ela acredita que todos têm o potencial de transformar suas vidas através do poder do marketing digital, e está sempre aberta a conversar sobre isso com quem estiver interessado. \
    Se você deseja aprender mais sobre como viver do digital e transformar sua paixão em um negócio rentável, Alice está pronta para te guiar nessa jornada. \
    Entre em contato e descubra como a CRO pode te ajudar a alcançar seus objetivos!";


/// Builds prompts from the persona, recent history and the new turn, and asks
/// the completion service for a reply.
pub struct ReplyGenerator {
    completion: Arc<dyn CompletionService>,
    history: Arc<HistoryStore>,
    model: String,
    temperature: f64,
    max_tokens: u32,
    prompt_window: usize,
}


impl ReplyGenerator {
    pub fn new(
        completion: Arc<dyn CompletionService>,
        history: Arc<HistoryStore>,
        config: &RelayConfig,
    ) -> Self {
        Self {
            completion,
            history,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            prompt_window: config.prompt_window,
        }
    }


    /// Returns the ordered message list sent for a turn.
    ///
    /// Layout: persona, past user turns (oldest first), past replies (oldest
    /// first), then `combined_text` as the final user message. Each history kind
    /// contributes at most `prompt_window` entries.
    pub fn build_messages(&self, user_id: &str, combined_text: &str) -> Vec<AIMessage> {
        let turns = self.history.get_recent(user_id, HistoryKind::Turn, self.prompt_window);
        let replies = self.history.get_recent(user_id, HistoryKind::Reply, self.prompt_window);

        let mut messages = Vec::with_capacity(turns.len() + replies.len() + 2);
        messages.push(AIMessage::new(Role::System, PERSONA_PREAMBLE));
        messages.extend(turns.into_iter().map(|t| AIMessage::new(Role::User, t)));
        messages.extend(replies.into_iter().map(|r| AIMessage::new(Role::Assistant, r)));
        messages.push(AIMessage::new(Role::User, combined_text));
        messages
    }


    pub async fn generate(&self, user_id: &str, combined_text: &str) -> Result<String, ServiceError> {
        let request = CompletionRequest {
            model: self.model.clone(),
            messages: self.build_messages(user_id, combined_text),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let reply = self.completion.complete(&request).await?;
        Ok(reply.trim().to_string())
    }
}
