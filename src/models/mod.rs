pub mod lang_profile;
pub mod resolvers;
pub mod skill_config;

pub use self::lang_profile::{load_language_profiles, FallbackRule, LanguageProfile, LanguageProfiles};
pub use self::resolvers::{global_resolver_path, GlobalResolverModel};
pub use self::skill_config::{
    ActionConfig, ExpectedItem, ExpectedItemKind, LoopConfig, ResolverIntent, SkillConfig,
    SkillResolverConfig, SlotConfig,
};
