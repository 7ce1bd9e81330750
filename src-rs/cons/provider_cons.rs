use serde::{Deserialize, Serialize};

/// Wire format a backend speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireFormat {
    ChatCompletions,
    AnthropicMessages,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LLMProvider {
    OpenAI,
    Claude,
    DeepSeek,
    Qwen,
    ZhipuAI,
}

impl LLMProvider {
    /// Returns the unique organization identifier used in configuration (e.g., "openai", "claude")
    pub fn provider_name(&self) -> &'static str {
        match self {
            LLMProvider::OpenAI => "openai",
            LLMProvider::Claude => "claude",
            LLMProvider::DeepSeek => "deepseek",
            LLMProvider::Qwen => "qwen",
            LLMProvider::ZhipuAI => "zhipuai",
        }
    }

    /// Helper to parse from a string (handles aliases)
    pub fn from_name(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Some(LLMProvider::OpenAI),
            "claude" | "anthropic" => Some(LLMProvider::Claude),
            "deepseek" => Some(LLMProvider::DeepSeek),
            "qwen" => Some(LLMProvider::Qwen),
            "zhipuai" => Some(LLMProvider::ZhipuAI),
            _ => None,
        }
    }

    pub fn wire_format(&self) -> WireFormat {
        match self {
            LLMProvider::Claude => WireFormat::AnthropicMessages,
            _ => WireFormat::ChatCompletions,
        }
    }

    pub fn default_endpoint(&self) -> &'static str {
        match self {
            LLMProvider::OpenAI => "https://api.openai.com/v1",
            LLMProvider::Claude => "https://api.anthropic.com",
            LLMProvider::DeepSeek => "https://api.deepseek.com",
            LLMProvider::Qwen => "https://dashscope.aliyuncs.com/compatible-mode/v1",
            LLMProvider::ZhipuAI => "https://open.bigmodel.cn/api/paas/v4",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            LLMProvider::OpenAI => "gpt-4",
            LLMProvider::Claude => "claude-3-5-sonnet-latest",
            LLMProvider::DeepSeek => "deepseek-chat",
            LLMProvider::Qwen => "qwen-plus",
            LLMProvider::ZhipuAI => "glm-4",
        }
    }
}

// Ensure Display trait matches provider_name for convenience
impl std::fmt::Display for LLMProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.provider_name())
    }
}

pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_CLAUDE_MAX_TOKENS: u32 = 4096;
pub const ANTHROPIC_VERSION: &str = "2023-06-01";
