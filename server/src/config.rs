//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Server ohne Konfigurationsdatei
//! lauffaehig ist. Die Umgebungsvariable `PORT` ueberschreibt den
//! WebSocket-Port.

use relais_observability::logging::{log_format_gueltig, log_level_gueltig};
use relais_signaling::SignalingConfig;
use serde::{Deserialize, Serialize};

/// Standard-Port fuer WebSocket-Verbindungen
pub const STANDARD_PORT: u16 = 3834;

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Netzwerk-Einstellungen
    pub netzwerk: NetzwerkEinstellungen,
    /// Signaling-Einstellungen (Limits, Keepalive)
    pub signaling: SignalingEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
    /// Observability-Einstellungen (Metriken, Health)
    pub observability: ObservabilityEinstellungen,
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    /// Bind-Adresse fuer alle Listener
    pub bind_adresse: String,
    /// Port fuer WebSocket-Verbindungen
    pub port: u16,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            port: STANDARD_PORT,
        }
    }
}

/// Signaling-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalingEinstellungen {
    /// Maximale gleichzeitige Verbindungen
    pub max_verbindungen: usize,
    /// Groesse der Send-Queue pro Verbindung
    pub send_queue_groesse: usize,
    /// Keepalive-Intervall in Sekunden
    pub keepalive_sek: u64,
    /// Timeout fuer inaktive Verbindungen in Sekunden
    pub verbindungs_timeout_sek: u64,
    /// `connections`-Ereignis nach Connect/Disconnect verteilen
    pub verbindungen_ankuendigen: bool,
}

impl Default for SignalingEinstellungen {
    fn default() -> Self {
        let standard = SignalingConfig::default();
        Self {
            max_verbindungen: standard.max_verbindungen,
            send_queue_groesse: standard.send_queue_groesse,
            keepalive_sek: standard.keepalive_sek,
            verbindungs_timeout_sek: standard.verbindungs_timeout_sek,
            verbindungen_ankuendigen: standard.verbindungen_ankuendigen,
        }
    }
}

impl From<&SignalingEinstellungen> for SignalingConfig {
    fn from(e: &SignalingEinstellungen) -> Self {
        Self {
            max_verbindungen: e.max_verbindungen,
            send_queue_groesse: e.send_queue_groesse,
            keepalive_sek: e.keepalive_sek,
            verbindungs_timeout_sek: e.verbindungs_timeout_sek,
            verbindungen_ankuendigen: e.verbindungen_ankuendigen,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

/// Observability-Einstellungen (Metriken + Health-Check)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityEinstellungen {
    /// Aktiviert den Observability-Server
    pub aktiviert: bool,
    /// Port fuer Metriken und Health (Standard: 9300)
    pub port: u16,
}

impl Default for ObservabilityEinstellungen {
    fn default() -> Self {
        Self {
            aktiviert: true,
            port: 9300,
        }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        let mut config = match std::fs::read_to_string(pfad) {
            Ok(inhalt) => toml::from_str::<Self>(&inhalt)
                .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Self::default()
            }
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
                ))
            }
        };

        if let Ok(port) = std::env::var("PORT") {
            config.port_ueberschreiben(&port)?;
        }
        Ok(config)
    }

    /// Setzt den WebSocket-Port aus einem String (Wert von `PORT`)
    pub fn port_ueberschreiben(&mut self, wert: &str) -> anyhow::Result<()> {
        let port: u16 = wert
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("Ungueltiger PORT '{wert}': {e}"))?;
        self.netzwerk.port = port;
        Ok(())
    }

    /// Prueft alle Abschnitte auf Konsistenz
    pub fn validieren(&self) -> anyhow::Result<()> {
        self.signaling_config().validieren()?;
        if !log_level_gueltig(&self.logging.level) {
            anyhow::bail!("Ungueltiges Log-Level: '{}'", self.logging.level);
        }
        if !log_format_gueltig(&self.logging.format) {
            anyhow::bail!("Ungueltiges Log-Format: '{}'", self.logging.format);
        }
        if self.observability.aktiviert && self.observability.port == self.netzwerk.port {
            anyhow::bail!("Observability-Port und WebSocket-Port sind identisch");
        }
        Ok(())
    }

    /// Gibt die Signaling-Konfiguration fuer `relais-signaling` zurueck
    pub fn signaling_config(&self) -> SignalingConfig {
        SignalingConfig::from(&self.signaling)
    }

    /// Gibt die vollstaendige Bind-Adresse fuer WebSocket zurueck
    pub fn ws_bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.port)
    }

    /// Gibt die Bind-Adresse fuer den Observability-Server zurueck
    pub fn observability_bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.observability.port)
    }
}
