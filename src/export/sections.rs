use crate::store::SectionId;

const FEATURES: [&str; 4] = [
    "Theme tokens",
    "Reusable components",
    "Pro finish",
    "Export/Pages",
];
const TIERS: [(&str, &str); 3] = [("Starter", "$0"), ("Pro", "$9"), ("Team", "$29")];
const FAQ: [(&str, &str); 3] = [
    ("Is this legal?", "We use style tokens, not copying logos/assets."),
    ("Mobile friendly?", "Yes, preview and edits work on mobile."),
    ("Export?", "Copy HTML or download theme JSON now; ZIP/PR later."),
];

pub fn render_section(section: SectionId) -> String {
    let inner = match section {
        SectionId::Hero => "      <h3>Aesthetic UI, faster.</h3>
      <p>Start from a great preset, tweak tokens, assemble sections, ship with pro finish.</p>
      <div class=\"cta\">
        <button class=\"btn primary\">Get Started</button>
        <button class=\"btn\">Docs</button>
      </div>"
            .to_string(),
        SectionId::Features => {
            let cards: String = FEATURES
                .iter()
                .map(|title| {
                    format!(
                        "\n        <div class=\"card\"><strong>{title}</strong><p>Cohesive styling from a single source of truth.</p></div>"
                    )
                })
                .collect();
            format!("      <h3>Features</h3>\n      <div class=\"grid\">{cards}\n      </div>")
        }
        SectionId::Pricing => {
            let tiers: String = TIERS
                .iter()
                .map(|(name, price)| {
                    format!(
                        "\n        <div class=\"tier\"><div class=\"name\">{name}</div><div class=\"price\">{price}/mo</div><button class=\"btn primary\">Choose</button></div>"
                    )
                })
                .collect();
            format!("      <h3>Pricing</h3>\n      <div class=\"tiers\">{tiers}\n      </div>")
        }
        SectionId::Faq => {
            let entries: String = FAQ
                .iter()
                .map(|(question, answer)| {
                    format!(
                        "\n      <details><summary>{question}</summary><p>{answer}</p></details>"
                    )
                })
                .collect();
            format!("      <h3>FAQ</h3>{entries}")
        }
        SectionId::Footer => "      <div class=\"footer\">
        <span>&copy; Scenestealer Engine</span>
        <a href=\"https://github.com\" target=\"_blank\" rel=\"noreferrer\">GitHub</a>
      </div>"
            .to_string(),
    };

    format!(
        "    <section class=\"section {class}\">\n{inner}\n    </section>",
        class = section.as_str()
    )
}
