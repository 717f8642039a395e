//! Template pools keyed by template key and audience.
//!
//! The built-in pools hold the stock Portuguese phrasing. Deployments replace
//! any pool through the `[templates]` table of the funnel config.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use funnelbot_types::classification::LeadCategory;
use funnelbot_types::error::ComposeError;

/// Who a phrasing is written for. `Any` is the fallback pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Audience {
    Buyer,
    Customer,
    Undefined,
    Any,
}

impl Audience {
    pub fn as_str(&self) -> &'static str {
        match self {
            Audience::Buyer => "buyer",
            Audience::Customer => "customer",
            Audience::Undefined => "undefined",
            Audience::Any => "any",
        }
    }
}

impl From<LeadCategory> for Audience {
    fn from(category: LeadCategory) -> Self {
        match category {
            LeadCategory::Buyer => Audience::Buyer,
            LeadCategory::Customer => Audience::Customer,
            LeadCategory::Undefined => Audience::Undefined,
        }
    }
}

impl fmt::Display for Audience {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Audience {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "buyer" => Ok(Audience::Buyer),
            "customer" => Ok(Audience::Customer),
            "undefined" => Ok(Audience::Undefined),
            "any" => Ok(Audience::Any),
            other => Err(format!("unknown audience: '{other}'")),
        }
    }
}

macro_rules! template_keys {
    ($($variant:ident => $name:literal,)+) => {
        /// Identifies one message the bot can send.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum TemplateKey {
            $($variant,)+
        }

        impl TemplateKey {
            pub const ALL: &'static [TemplateKey] = &[$(TemplateKey::$variant,)+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(TemplateKey::$variant => $name,)+
                }
            }
        }

        impl FromStr for TemplateKey {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(TemplateKey::$variant),)+
                    other => Err(format!("unknown template key: '{other}'")),
                }
            }
        }
    };
}

template_keys! {
    GreetingPitch => "greeting_pitch",
    GreetingPitchFollowUp => "greeting_pitch_follow_up",
    OfferFallback => "offer_fallback",
    Qualification => "qualification",
    MediaOnly => "media_only",
    QualifyingAccept => "qualifying_accept",
    QualifyingPersuade => "qualifying_persuade",
    QualifyingDecline => "qualifying_decline",
    QualifyingReprompt => "qualifying_reprompt",
    DeviceInstructions => "device_instructions",
    DeviceInstallFollowUp => "device_install_follow_up",
    DeviceReprompt => "device_reprompt",
    InstallTrouble => "install_trouble",
    InstallReprompt => "install_reprompt",
    TrialCredentials => "trial_credentials",
    TrialChannelsFollowUp => "trial_channels_follow_up",
    TrialTeaser => "trial_teaser",
    TrialSuccess => "trial_success",
    TrialTroubleshoot => "trial_troubleshoot",
    TrialReprompt => "trial_reprompt",
    PlanTable => "plan_table",
    PlanChosen => "plan_chosen",
    PlanReprompt => "plan_reprompt",
    PriceObjection => "price_objection",
    PaymentConfirmed => "payment_confirmed",
    PaymentBonusFollowUp => "payment_bonus_follow_up",
    PaymentReminder => "payment_reminder",
    ActiveCustomerMenu => "active_customer_menu",
    ReferralPrompt => "referral_prompt",
    ReferralCaptured => "referral_captured",
    ReferralInvalid => "referral_invalid",
    SupportGreeting => "support_greeting",
    SupportAskDevice => "support_ask_device",
    SupportAskApp => "support_ask_app",
    SupportXtreamFix => "support_xtream_fix",
    SupportFireStickFix => "support_fire_stick_fix",
    SupportGenericFix => "support_generic_fix",
    SupportRenewal => "support_renewal",
    SupportResolved => "support_resolved",
    HandoverImmediate => "handover_immediate",
    HandoverAskName => "handover_ask_name",
    HandoverAskDevice => "handover_ask_device",
    HandoverAskInterest => "handover_ask_interest",
    HandoverAskTechnical => "handover_ask_technical",
    HandoverAskLastWorking => "handover_ask_last_working",
    HandoverDoneSales => "handover_done_sales",
    HandoverDoneSupport => "handover_done_support",
    HandoverSummarySales => "handover_summary_sales",
    HandoverSummarySupport => "handover_summary_support",
    HandoverSummaryCancellation => "handover_summary_cancellation",
}

impl TemplateKey {
    /// Promotional pitches are subject to the offer cooldown.
    pub fn is_promotional(&self) -> bool {
        matches!(self, TemplateKey::GreetingPitch)
    }
}

impl fmt::Display for TemplateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct TemplateCatalog {
    pools: HashMap<(TemplateKey, Audience), Vec<String>>,
}

impl TemplateCatalog {
    /// Catalog with only the built-in phrasing.
    pub fn builtin() -> Self {
        let mut pools = HashMap::new();
        for (key, audience, phrasings) in BUILTIN {
            pools.insert(
                (*key, *audience),
                phrasings.iter().map(|p| p.to_string()).collect(),
            );
        }
        Self { pools }
    }

    /// Built-in phrasing with config overrides applied.
    ///
    /// A plain `"key"` override replaces every audience pool of that key; a
    /// `"key.audience"` override replaces just that audience.
    pub fn with_overrides(overrides: &BTreeMap<String, Vec<String>>) -> Result<Self, ComposeError> {
        let mut catalog = Self::builtin();

        let mut scoped = Vec::new();
        for (raw, phrasings) in overrides {
            if phrasings.is_empty() {
                return Err(ComposeError::Malformed {
                    template: raw.clone(),
                    reason: "override pool is empty".to_string(),
                });
            }

            match raw.split_once('.') {
                None => {
                    let key = parse_key(raw)?;
                    catalog.pools.retain(|(k, _), _| *k != key);
                    catalog.pools.insert((key, Audience::Any), phrasings.clone());
                }
                Some((key, audience)) => {
                    let key = parse_key(key)?;
                    let audience = audience.parse::<Audience>().map_err(|reason| {
                        ComposeError::Malformed {
                            template: raw.clone(),
                            reason,
                        }
                    })?;
                    scoped.push(((key, audience), phrasings.clone()));
                }
            }
        }

        for (slot, phrasings) in scoped {
            catalog.pools.insert(slot, phrasings);
        }

        Ok(catalog)
    }

    /// Pool for `key`, preferring the audience-specific one.
    pub fn pool(&self, key: TemplateKey, audience: Audience) -> Result<&[String], ComposeError> {
        self.pools
            .get(&(key, audience))
            .or_else(|| self.pools.get(&(key, Audience::Any)))
            .map(Vec::as_slice)
            .ok_or_else(|| ComposeError::MissingTemplate(format!("{key}.{audience}")))
    }

    /// Every (key, audience, phrasing) triple, for validation.
    pub fn entries(&self) -> impl Iterator<Item = (TemplateKey, Audience, &str)> {
        self.pools.iter().flat_map(|((key, audience), phrasings)| {
            phrasings.iter().map(move |p| (*key, *audience, p.as_str()))
        })
    }
}

impl Default for TemplateCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn parse_key(raw: &str) -> Result<TemplateKey, ComposeError> {
    raw.parse::<TemplateKey>().map_err(|reason| ComposeError::Malformed {
        template: raw.to_string(),
        reason,
    })
}

type Pool = (TemplateKey, Audience, &'static [&'static str]);

const BUILTIN: &[Pool] = &[
    // ---------------------------------------------------------------------
    // START
    // ---------------------------------------------------------------------
    (
        TemplateKey::GreetingPitch,
        Audience::Any,
        &[
            "Oi {name}! 👋\n\n\
             Você chegou no momento PERFEITO! 🎯\n\n\
             Acabamos de liberar *APENAS HOJE* acesso VIP a *SKY completa, Netflix, Amazon Prime, Disney+, Globoplay* e +50.000 filmes em 4K...\n\n\
             De ~{regularPrice}~ por apenas *{promoPrice}*, *SEM MENSALIDADE*! 🔥\n\n\
             Quer ver funcionando no seu celular AGORA? 📱",
            "Oi {name}, tudo bem? 😊\n\n\
             Sou o {assistant}, da {brand}! Você se interessa por *canais de TV online?*\n\n\
             *Sky, Netflix, Prime Vídeo, Globoplay* e +65.000 canais abertos e fechados, além de *todos os campeonatos nacionais e internacionais*.\n\n\
             Tudo isso instalando um aplicativo com preço promocional HOJE: de ~{regularPrice}~ por *{promoPrice}*!",
        ],
    ),
    (
        TemplateKey::GreetingPitch,
        Audience::Buyer,
        &[
            "Olá {name}! 👋 Que bom ter seu interesse nos nossos planos!\n\n\
             Temos acesso completo à *Sky, Netflix, Prime Video, Globo Play e +65.847 canais* direto na sua TV! 📺\n\n\
             Temos uma *promoção especial hoje*: de {regularPrice} por apenas *{promoPrice}*, com taxa de manutenção de {maintenanceFee}/mês 💸",
            "Oi {name}! Bem-vindo à {brand}! 😊\n\n\
             Oferecemos *Sky, Netflix, Disney+, Combate, Premiere* e filmes direto do cinema! 🎬\n\n\
             Só hoje: *{promoPrice}* (em vez de {regularPrice}) + manutenção de {maintenanceFee}/mês.",
        ],
    ),
    (
        TemplateKey::GreetingPitchFollowUp,
        Audience::Any,
        &[
            "🚨 *OFERTA RELÂMPAGO - SÓ ATÉ 23:59h*\n\n\
             Responda *SIM* se quer:\n\
             ✅ Teste GRÁTIS de {trialHours} horas\n\
             ✅ Todos os canais da SKY em HD/4K\n\
             ✅ Netflix, Amazon, Disney+ liberados\n\
             ✅ +50.000 filmes em qualidade cinema\n\n\
             *Ou responda NÃO se não quer economizar R$150+ por mês...*\n\n\
             Qual sua resposta? 🤔",
        ],
    ),
    (
        TemplateKey::OfferFallback,
        Audience::Any,
        &[
            "Oi {name}! 😊\n\n\
             Vi que você já recebeu nossa oferta hoje e tem interesse nos nossos planos!\n\n\
             Quer seguir para o *teste grátis*? Responda *SIM* que eu te mostro como instalar na TV, celular ou FireStick 📱",
        ],
    ),
    (
        TemplateKey::Qualification,
        Audience::Any,
        &[
            "Oi {name}! Posso te ajudar com alguma coisa? 😊\n\nVocê:\n🆕 Está conhecendo nossos planos agora\n🔧 Precisa de suporte técnico",
            "Olá! Sou da equipe {brand}. Em que posso ajudar?\n\n• Apresentar nossos planos\n• Resolver problemas técnicos\n• Tirar dúvidas",
            "Oi {name}! Me conta: você já é nosso cliente ou está conhecendo agora? Assim posso te ajudar melhor! 👍",
        ],
    ),
    (
        TemplateKey::MediaOnly,
        Audience::Any,
        &[
            "👋 Oi! Recebi sua mensagem!\n\n\
             Para melhor atendimento, envie mensagens em texto.\n\n\
             Quer conhecer nossos planos IPTV? Digite *SIM*!",
        ],
    ),
    // ---------------------------------------------------------------------
    // QUALIFYING
    // ---------------------------------------------------------------------
    (
        TemplateKey::QualifyingAccept,
        Audience::Any,
        &[
            "🎉 *EXCELENTE ESCOLHA!*\n\n\
             Você está a poucos minutos de ter acesso ao melhor conteúdo...\n\n\
             *Primeira pergunta importante:*\n\
             Onde você quer assistir principalmente?\n\n\
             {deviceMenu}\n\n\
             Digite apenas o NÚMERO da sua escolha! 👆",
        ],
    ),
    (
        TemplateKey::QualifyingPersuade,
        Audience::Any,
        &[
            "Entendo sua hesitação... 🤔\n\n\
             Mas deixa eu te mostrar os REAIS BENEFÍCIOS:\n\n\
             💰 *Economia de R$150+ por mês*\n\
             📺 *Os mesmos canais das TVs por assinatura*\n\
             🎬 *50.000+ filmes*\n\
             ⚡ *Funciona em qualquer lugar*\n\n\
             Quer pelo menos ver o TESTE GRÁTIS funcionando? É só 2 minutos, sem compromisso!\n\n\
             *SIM* ou *NÃO DEFINITIVO*?",
        ],
    ),
    (
        TemplateKey::QualifyingDecline,
        Audience::Any,
        &[
            "Tudo bem, {name}! Respeito sua decisão 🙏\n\nSe mudar de ideia, é só mandar *SIM* aqui que eu libero seu teste grátis na hora.",
        ],
    ),
    (
        TemplateKey::QualifyingReprompt,
        Audience::Any,
        &[
            "Por favor, responda apenas:\n\n*SIM* - Se quer o teste grátis\n*NÃO* - Se não quer economizar\n\nQual sua resposta? 🤔",
        ],
    ),
    // ---------------------------------------------------------------------
    // DEVICE_SELECTION
    // ---------------------------------------------------------------------
    (
        TemplateKey::DeviceInstructions,
        Audience::Any,
        &[
            "📺 *PERFEITO PARA {deviceLabel}!*\n\n\
             *Passo super simples:*\n\
             1. Abra a {storeHint}\n\
             2. Procure por: *\"{app}\"*\n\
             3. Instale e abra o aplicativo\n\n\
             *💡 ALTERNATIVAS que sempre funcionam:*\n\
             {alternatives}\n\n\
             *⚡ Em poucos minutos você está assistindo!*",
        ],
    ),
    (
        TemplateKey::DeviceInstallFollowUp,
        Audience::Any,
        &[
            "🎯 *ENQUANTO VOCÊ INSTALA...*\n\n\
             Já vou deixar seu TESTE GRÁTIS de {trialHours} horas preparado!\n\n\
             *Me confirma quando terminar de instalar!*\n\
             Digite: *PRONTO* ou *INSTALEI*",
        ],
    ),
    (
        TemplateKey::DeviceReprompt,
        Audience::Any,
        &["Por favor, escolha apenas o NÚMERO:\n\n{deviceMenu}\n\nDigite o número da sua escolha."],
    ),
    // ---------------------------------------------------------------------
    // APP_INSTALL_WAIT
    // ---------------------------------------------------------------------
    (
        TemplateKey::InstallTrouble,
        Audience::Any,
        &[
            "🆘 *SEM PROBLEMAS!*\n\n\
             *Alternativas que funcionam em qualquer dispositivo:*\n\
             - XPIPTV\n- VU IPTV PLAYER\n- IPTV SMARTERS PRO\n- 9XTREAM PLAYER\n- CANALPLAY\n\n\
             *🎯 DICA:* em todos esses apps, procure por *\"XTREAM CODES\"* ou *\"Adicionar Playlist\"*.\n\n\
             Conseguiu instalar algum? Digite *PRONTO* quando terminar.",
        ],
    ),
    (
        TemplateKey::InstallReprompt,
        Audience::Any,
        &["⏰ Me confirma quando conseguir instalar o aplicativo...\n\nDigite: *PRONTO* quando terminar! 🎯"],
    ),
    // ---------------------------------------------------------------------
    // TRIAL_ISSUED
    // ---------------------------------------------------------------------
    (
        TemplateKey::TrialCredentials,
        Audience::Any,
        &[
            "🎉 *PARABÉNS! ACESSO VIP LIBERADO!*\n\n\
             *Seus dados de teste (VÁLIDOS POR {trialHours}H):*\n\n\
             ✅ *Usuário:* {credential.username}\n\
             ✅ *Senha:* {credential.password}\n\
             🔗 *URL:* {credential.url}\n\n\
             *⚡ IMPORTANTE:* coloque os dados EXATAMENTE como enviei! Qualquer espaço a mais pode dar erro.",
        ],
    ),
    (
        TemplateKey::TrialChannelsFollowUp,
        Audience::Any,
        &[
            "📺 *AGORA TESTE ESTES CANAIS VIP:*\n\n\
             - Globo 4K, SBT 4K, Record 4K\n\
             - ESPN 4K, Fox Sports 4K\n\
             - Telecine Premium 4K\n\n\
             *Depois me confirma aqui:*\n\
             *\"FUNCIONOU\"* ou *\"DEU ERRO\"*",
        ],
    ),
    (
        TemplateKey::TrialTeaser,
        Audience::Any,
        &[
            "🚨 *{name}, seu teste expira em BREVE!*\n\n\
             ⚠️ *Restam poucas vagas* na promoção\n\
             ⚠️ *O preço volta ao normal amanhã*\n\n\
             Quer garantir sua vaga? Me diga *FUNCIONOU* que eu te mostro os planos VIP ⏰",
        ],
    ),
    (
        TemplateKey::TrialSuccess,
        Audience::Any,
        &[
            "🎯 *SENSACIONAL!*\n\n\
             Agora você viu a qualidade PROFISSIONAL!\n\n\
             *Com o acesso definitivo você ganha:*\n\
             📺 *+300 canais 4K*\n\
             🎬 *+80.000 filmes e séries*\n\
             ⚡ *Suporte VIP pelo WhatsApp*\n\n\
             Quer ativar SEU acesso definitivo? 🚀",
        ],
    ),
    (
        TemplateKey::TrialTroubleshoot,
        Audience::Any,
        &[
            "🔧 *VAMOS RESOLVER JUNTOS!*\n\n\
             *Checklist rápido:*\n\
             ✅ URL completa? `{serverUrl}`\n\
             ✅ Usuário sem espaços extras?\n\
             ✅ Senha copiada correta?\n\
             ✅ Clicou em *XTREAM CODES*?\n\n\
             *Se ainda não funcionar:*\n\
             1. Feche e abra o app novamente\n\
             2. Teste sua conexão de internet\n\
             3. Tente outro app da lista: {alternatives}\n\
             4. Reinicie seu dispositivo\n\n\
             *Me confirma com PRONTO quando reinstalar!* 💪",
        ],
    ),
    (
        TemplateKey::TrialReprompt,
        Audience::Any,
        &[
            "⏰ *SEU TESTE ESTÁ RODANDO!*\n\nPor favor me confirma:\n\n*FUNCIONOU* - Se conseguiu ver os canais\n*ERRO* - Se deu algum problema",
        ],
    ),
    // ---------------------------------------------------------------------
    // PLAN_PRESENTED
    // ---------------------------------------------------------------------
    (
        TemplateKey::PlanTable,
        Audience::Any,
        &["💎 *PLANOS VIP EXCLUSIVOS*\n\n{planList}\n\n*Qual faz mais sentido para você?*\n\nDigite: {planOptions}"],
    ),
    (
        TemplateKey::PlanChosen,
        Audience::Any,
        &[
            "*✅ Plano escolhido:* {planName}\n\
             *💰 Valor:* {price} ({planPeriod})\n\
             *📺 Telas incluídas:* {planScreens}\n\n\
             *💳 PAGAMENTO SUPER FÁCIL:*\n\
             PIX para: *{pixKey}*\n\
             *Nome do recebedor:* {receiver}\n\n\
             *📱 Após o PIX, me envie o comprovante!* Ativação em até 5 minutos ⚡",
        ],
    ),
    (
        TemplateKey::PlanReprompt,
        Audience::Any,
        &["Por favor, escolha um dos planos:\n\n{planList}\n\nDigite: {planOptions}"],
    ),
    (
        TemplateKey::PriceObjection,
        Audience::Any,
        &[
            "💰 *ENTENDO TOTALMENTE SUA PREOCUPAÇÃO!*\n\n\
             Mas olha só esta comparação real:\n\n\
             - Netflix: R$45/mês\n\
             - Amazon Prime: R$15/mês\n\
             - Disney+: R$28/mês\n\
             - Globoplay: R$25/mês\n\
             - SKY básica: R$120/mês\n\
             - Cinema (família): R$80/mês\n\n\
             *TOTAL: R$313/mês = R$3.756/ano!* 😱\n\n\
             Com a {brand} você tem tudo isso em um só lugar:\n\n\
             {planList}\n\n\
             Qual plano faz sentido para você? Digite: {planOptions}",
        ],
    ),
    // ---------------------------------------------------------------------
    // PAYMENT_PENDING / ACTIVE_CUSTOMER
    // ---------------------------------------------------------------------
    (
        TemplateKey::PaymentConfirmed,
        Audience::Any,
        &[
            "🎉 *PAGAMENTO CONFIRMADO COM SUCESSO!*\n\n\
             *PARABÉNS! SEU ACESSO FOI ATIVADO!* ✅\n\n\
             🔐 *SUAS CREDENCIAIS DEFINITIVAS:*\n\
             ✅ *Usuário:* {credential.username}\n\
             ✅ *Senha:* {credential.password}\n\
             🔗 *URL:* {credential.url}\n\n\
             *Substitua os dados de teste por estes definitivos.*",
        ],
    ),
    (
        TemplateKey::PaymentBonusFollowUp,
        Audience::Any,
        &[
            "🎁 *BÔNUS ESPECIAIS ATIVADOS:*\n\n\
             ✅ Acesso ao grupo VIP de suporte técnico\n\
             ✅ Garantia de 30 dias\n\
             ✅ Suporte pelo WhatsApp\n\n\
             *📲 GRUPO VIP DE SUPORTE:*\n{supportGroup}\n\n\
             *🔥 GANHE RENDA EXTRA:* indique amigos! É só digitar *INDICAR*.\n\n\
             *Bem-vindo à família {brand}!* 🙏",
        ],
    ),
    (
        TemplateKey::PaymentReminder,
        Audience::Any,
        &[
            "⏰ *AGUARDANDO SEU PAGAMENTO...*\n\n\
             *Plano:* {planName} - {price}\n\
             *🔑 Chave PIX:* {pixKey}\n\
             *👤 Nome do recebedor:* {receiver}\n\n\
             *📱 Após o PIX, me envie aqui:*\n\
             - Print/foto do comprovante OU\n\
             - Digite \"PAGUEI\"",
        ],
    ),
    (
        TemplateKey::ActiveCustomerMenu,
        Audience::Any,
        &[
            "Oi {name}! Seu acesso {brand} está ativo ✅\n\n\
             Posso te ajudar com:\n\
             🔧 *Suporte* - se algo não estiver funcionando\n\
             👥 *Indicar* - indique um amigo e ganhe benefícios\n\n\
             Grupo VIP de suporte: {supportGroup}",
        ],
    ),
    // ---------------------------------------------------------------------
    // REFERRAL_COLLECTION
    // ---------------------------------------------------------------------
    (
        TemplateKey::ReferralPrompt,
        Audience::Any,
        &[
            "👥 *PROGRAMA DE INDICAÇÕES {brand}*\n\n\
             🎉 *BENEFÍCIOS PARA VOCÊ:*\n\
             ✅ +1 tela GRÁTIS permanente\n\
             ✅ +2 meses grátis no seu plano\n\n\
             *📱 Me envie o número:*\n\
             Exemplo: 11999887766\n\n\
             Qual número quer indicar? 😊",
        ],
    ),
    (
        TemplateKey::ReferralCaptured,
        Audience::Any,
        &[
            "✅ *INDICAÇÃO REGISTRADA COM SUCESSO!*\n\n\
             📱 *Número indicado:* {referral}\n\n\
             *🎯 Vou entrar em contato com a pessoa e mencionar que foi você quem indicou!*\n\n\
             *Obrigado pela confiança!* 🙏",
        ],
    ),
    (
        TemplateKey::ReferralInvalid,
        Audience::Any,
        &[
            "❌ Não consegui identificar o número!\n\n\
             *Por favor, envie apenas os números:*\n\
             *Exemplo:* 11999887766\n\n\
             *Não precisa colocar parênteses, traços ou espaços.*\n\n\
             Qual o número da pessoa que quer indicar?",
        ],
    ),
    // ---------------------------------------------------------------------
    // SUPPORT
    // ---------------------------------------------------------------------
    (
        TemplateKey::SupportGreeting,
        Audience::Any,
        &[
            "Oi {name}! Sou o *Téc. {assistant}* 👨‍💻 Vou resolver seu problema rapidinho!",
            "Olá {name}! Suporte técnico {brand} aqui! Vamos resolver isso para você! 🔧",
            "Oi {name}! Identifiquei que você precisa de ajuda técnica. Estou aqui para isso! ⚡",
        ],
    ),
    (
        TemplateKey::SupportAskDevice,
        Audience::Any,
        &[
            "Para te ajudar melhor, em qual dispositivo está usando?\n\n{deviceMenu}",
            "Vou fazer umas perguntinhas rápidas. Qual seu dispositivo?\n\n{deviceMenu}",
        ],
    ),
    (
        TemplateKey::SupportAskApp,
        Audience::Any,
        &[
            "Qual aplicativo está usando?\n\n1️⃣ Absoluto player\n2️⃣ Canalplay\n3️⃣ XCiptv, XPiptv, 9Xtream\n4️⃣ IPTV Smarters\n\nPode escrever o nome do app 😉",
            "Me diga qual app está usando (ex.: IPTV Smarters, 9Xtream, XP IPTV, Canalplay):",
        ],
    ),
    (
        TemplateKey::SupportXtreamFix,
        Audience::Any,
        &[
            "Vi que está com problema no 9Xtream.\n\n\
             Vamos testar estas opções:\n\n\
             ✅ Reinstalar o app\n\
             ✅ Testar outro app (XP IPTV ou Canalplay)\n\
             ✅ Verificar seus dados de login\n\n\
             Me diga se *RESOLVEU* depois de tentar 🙏",
        ],
    ),
    (
        TemplateKey::SupportFireStickFix,
        Audience::Any,
        &[
            "Fire Stick identificado! 📺\n\n\
             Para resolver problemas no Fire Stick:\n\n\
             1️⃣ Limpar cache do app\n\
             2️⃣ Testar app alternativo\n\
             3️⃣ Verificar conexão WiFi\n\n\
             Me diga se *RESOLVEU* ou o que exatamente está acontecendo.",
        ],
    ),
    (
        TemplateKey::SupportGenericFix,
        Audience::Any,
        &[
            "Entendi! {app} no {device} 🛠️\n\n\
             Tente estes passos:\n\
             1. Feche e abra o app\n\
             2. Confira usuário, senha e URL `{serverUrl}`\n\
             3. Reinicie o aparelho e o roteador\n\n\
             Me diga se *RESOLVEU*!",
        ],
    ),
    (
        TemplateKey::SupportRenewal,
        Audience::Any,
        &[
            "Seu acesso está vencendo! 🔔\n\n\
             Para manter seu desconto, renove por apenas *{maintenanceFee}*\n\n\
             *PIX*: {pixKey}\n*Recebedor:* {receiver}\n\n\
             Depois é só me mandar o comprovante 😉",
        ],
    ),
    (
        TemplateKey::SupportResolved,
        Audience::Any,
        &["Perfeito, {name}! Fico feliz que resolveu ✅\n\nQualquer coisa é só chamar. Grupo VIP de suporte: {supportGroup}"],
    ),
    // ---------------------------------------------------------------------
    // Handover
    // ---------------------------------------------------------------------
    (
        TemplateKey::HandoverImmediate,
        Audience::Any,
        &[
            "Entendo sua situação. Vou te conectar imediatamente com nosso supervisor. Aguarde um momento... ⚡\n\n\
             *🕐 Horário de atendimento: 8h às 22h (segunda a domingo)*",
        ],
    ),
    (
        TemplateKey::HandoverAskName,
        Audience::Any,
        &["Perfeito! Vou te conectar com nosso especialista em vendas. Primeiro, me diga seu nome completo:"],
    ),
    (
        TemplateKey::HandoverAskDevice,
        Audience::Any,
        &[
            "Obrigado, {name}! Em qual dispositivo você pretende usar principalmente?\n\n\
             1️⃣ Smart TV\n2️⃣ Celular/Tablet\n3️⃣ Fire Stick/Chromecast\n4️⃣ Vários dispositivos",
        ],
    ),
    (
        TemplateKey::HandoverAskInterest,
        Audience::Any,
        &[
            "Qual seu principal interesse?\n\n\
             1️⃣ Canais de esporte\n2️⃣ Filmes e séries\n3️⃣ Canais infantis\n4️⃣ Pacote completo",
        ],
    ),
    (
        TemplateKey::HandoverAskTechnical,
        Audience::Any,
        &[
            "Vou te conectar com nosso suporte técnico especializado. Para agilizar, me confirme:\n\n\
             📱 Aplicativo que está usando:\n\
             📺 Dispositivo (TV/Celular/Fire Stick):\n\
             ⚠️ O que exatamente está acontecendo:",
        ],
    ),
    (
        TemplateKey::HandoverAskLastWorking,
        Audience::Any,
        &["Quando foi a última vez que funcionou normalmente? E já tentou reinstalar o aplicativo?"],
    ),
    (
        TemplateKey::HandoverDoneSales,
        Audience::Any,
        &[
            "Perfeito! Todas as informações coletadas. Agora vou te conectar com nosso especialista em vendas que vai cuidar de você pessoalmente. 😊",
        ],
    ),
    (
        TemplateKey::HandoverDoneSupport,
        Audience::Any,
        &[
            "Ótimo! Com essas informações nosso técnico especializado vai resolver seu problema rapidinho. Ele já está vendo seu caso e vai te responder em instantes! 🔧",
        ],
    ),
    (
        TemplateKey::HandoverSummarySales,
        Audience::Any,
        &[
            "📋 *NOVO LEAD - VENDAS*\n\
             👤 Nome: {customerName}\n\
             📱 Contato: {phone}\n\
             🎯 Interesse: {interest}\n\
             📺 Dispositivo: {device}\n\
             📊 Classificação: {category}\n\
             ⚡ Prioridade: {priority}\n\n\
             📝 *ÚLTIMAS MENSAGENS:*\n{recentMessages}\n\n\
             🎯 *MOTIVO DA TRANSFERÊNCIA:* {reason}",
        ],
    ),
    (
        TemplateKey::HandoverSummarySupport,
        Audience::Any,
        &[
            "🔧 *CLIENTE - SUPORTE TÉCNICO*\n\
             👤 Nome: {customerName}\n\
             📱 Contato: {phone}\n\
             📱 App usado: {app}\n\
             📺 Dispositivo: {device}\n\
             ⚠️ Problema: {problem}\n\
             🕐 Última vez funcionou: {lastWorking}\n\
             ⚡ Urgência: {urgency}\n\n\
             📝 *ÚLTIMAS MENSAGENS:*\n{recentMessages}\n\n\
             🎯 *MOTIVO DA TRANSFERÊNCIA:* {reason}",
        ],
    ),
    (
        TemplateKey::HandoverSummaryCancellation,
        Audience::Any,
        &[
            "⚠️ *CLIENTE INSATISFEITO - ATENÇÃO*\n\
             👤 Nome: {customerName}\n\
             📱 Contato: {phone}\n\
             ❌ Motivo: {reason}\n\
             ⚡ PRIORIDADE: ALTA\n\n\
             📝 *ÚLTIMAS MENSAGENS:*\n{recentMessages}",
        ],
    ),
];
