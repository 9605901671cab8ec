//! Closed-book system prompts, one per supported language.

use lorekeeper_types::lang::Lang;

/// Fixed refusal phrase the model must emit when the context lacks an answer.
pub fn refusal_phrase(lang: Lang) -> &'static str {
    match lang {
        Lang::Ko => "해당 정보는 제공된 문서에 없습니다.",
        Lang::En => "That information is not available in the provided documents.",
        Lang::Ja => "その情報は提供された文書にありません。",
    }
}

/// Label placed above the retrieved context.
pub fn context_header(lang: Lang) -> &'static str {
    match lang {
        Lang::Ko => "참고 문서",
        Lang::En => "Reference Documents",
        Lang::Ja => "参考文書",
    }
}

/// System prompt templates parameterized by the game name.
#[derive(Debug, Clone)]
pub struct SystemPrompts {
    game_name: String,
}

impl SystemPrompts {
    pub fn new(game_name: impl Into<String>) -> Self {
        Self {
            game_name: game_name.into(),
        }
    }

    /// The closed-book instruction block for `lang`.
    pub fn base(&self, lang: Lang) -> String {
        let game = &self.game_name;
        let refusal = refusal_phrase(lang);
        match lang {
            Lang::Ko => format!(
                "당신은 {game} 게임 전문 도우미입니다.\n\
                 반드시 주어진 참고 문서에 있는 내용만 답변하세요.\n\
                 참고 문서에 없는 내용은 절대 추측하거나 일반적인 정보를 제공하지 마세요.\n\
                 문서에 없는 내용은 \"{refusal}\"라고만 답변하세요.\n\
                 반드시 한국어로만 답변하세요."
            ),
            Lang::En => format!(
                "You are an expert assistant for the game {game}.\n\
                 You MUST only answer based on the provided reference documents.\n\
                 NEVER guess, infer, or provide general knowledge not found in the documents.\n\
                 If the information is not in the documents, only say \"{refusal}\"\n\
                 IMPORTANT: You MUST respond in English only. Do not use any other language."
            ),
            Lang::Ja => format!(
                "あなたは{game}ゲームの専門アシスタントです。\n\
                 必ず提供された参考文書に基づいてのみ回答してください。\n\
                 文書にない内容は絶対に推測したり、一般的な情報を提供したりしないでください。\n\
                 文書にない場合は「{refusal}」とだけ答えてください。\n\
                 重要：必ず日本語のみで回答してください。他の言語を使用しないでください。"
            ),
        }
    }

    /// The context block as it is shown to the model.
    pub fn context_block(lang: Lang, context: &str) -> String {
        format!("[{}]\n{}", context_header(lang), context)
    }

    /// System prompt with the context appended. Empty context adds nothing.
    pub fn with_context(&self, lang: Lang, context: &str) -> String {
        let mut prompt = self.base(lang);
        if !context.is_empty() {
            prompt.push_str("\n\n");
            prompt.push_str(&Self::context_block(lang, context));
        }
        prompt
    }
}
