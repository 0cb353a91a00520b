use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use sadbot_logging::{bot_info, bot_warn};
use serde::Deserialize;
use url::Url;

use crate::fetch::{api_client, get_api_body};
use crate::sink::{LocationStore, ReplySink};
use crate::{FailureKind, FetchError};

pub const OPENWEATHERMAP_URL: &str = "http://api.openweathermap.org/data/2.5/weather";

const DIRECTIONS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

/// Current conditions as returned by OpenWeatherMap. Temperatures in kelvin,
/// speeds in m/s.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Observation {
    #[serde(default)]
    pub weather: Vec<Condition>,
    pub main: Readings,
    #[serde(default)]
    pub wind: Wind,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Condition {
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Readings {
    pub temp: f64,
    #[serde(default)]
    pub humidity: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Wind {
    #[serde(default)]
    pub speed: f64,
    #[serde(default)]
    pub deg: f64,
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let conditions = self
            .weather
            .iter()
            .map(|condition| title_case(&condition.description))
            .collect::<Vec<_>>()
            .join(", ");
        let temp_c = self.main.temp - 273.15;
        let temp_f = temp_c * 1.8 + 32.0;
        write!(
            f,
            "{conditions}. {temp_f:.1} °F / {temp_c:.1} °C. Humidity {:.0}%. Wind from the {} at {:.1} m/h / {:.1} km/h. ({})",
            self.main.humidity,
            compass_direction(self.wind.deg),
            self.wind.speed * 2.23694,
            self.wind.speed * 3.6,
            self.name
        )
    }
}

/// Sixteen-point compass name for a bearing in degrees.
pub fn compass_direction(deg: f64) -> &'static str {
    let sector = (deg.rem_euclid(360.0) / 22.5 + 0.5) as usize;
    DIRECTIONS[sector % DIRECTIONS.len()]
}

fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone)]
pub struct WeatherClient {
    client: reqwest::Client,
    endpoint: Url,
    api_key: String,
}

impl WeatherClient {
    pub fn new(
        api_key: impl Into<String>,
        endpoint: Url,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        Ok(Self {
            client: api_client(timeout)?,
            endpoint,
            api_key: api_key.into(),
        })
    }

    pub async fn current(&self, location: &str) -> Result<Observation, FetchError> {
        bot_info!("Querying openweathermap for {location}");
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("q", location)
            .append_pair("APPID", &self.api_key);

        let body = get_api_body(&self.client, url).await?;
        serde_json::from_slice(&body)
            .map_err(|err| FetchError::new(FailureKind::MalformedBody, err.to_string()))
    }
}

/// What a `!w` line asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
enum WeatherRequest<'a> {
    Help,
    Set(&'a str),
    Clear,
    /// Stored location of another nick.
    Nick(&'a str),
    Stored,
    Place(&'a str),
}

impl<'a> WeatherRequest<'a> {
    fn parse(args: &'a str) -> Self {
        let args = args.trim();
        if let Some(nick) = args.strip_prefix('@') {
            WeatherRequest::Nick(nick.trim())
        } else if let Some(place) = args.strip_prefix("set ") {
            WeatherRequest::Set(place.trim())
        } else if args.starts_with("clear") {
            WeatherRequest::Clear
        } else if args.starts_with("help") {
            WeatherRequest::Help
        } else if args.is_empty() {
            WeatherRequest::Stored
        } else {
            WeatherRequest::Place(args)
        }
    }
}

/// The `!w` built-in: current weather for a place or a nick's stored place.
pub struct WeatherService {
    client: WeatherClient,
    locations: Arc<dyn LocationStore>,
}

impl WeatherService {
    pub fn new(client: WeatherClient, locations: Arc<dyn LocationStore>) -> Self {
        Self { client, locations }
    }

    pub async fn handle(&self, target: &str, requester: &str, args: &str, replies: &dyn ReplySink) {
        let location = match WeatherRequest::parse(args) {
            WeatherRequest::Help => {
                replies.send(
                    target,
                    &format!(
                        "{requester}: Check the weather! set will set your location (!w set San Francisco, CA), \
                         clear will remove your stored location, @ will show the weather for another nick (!w @sadbox), \
                         and help will show this message."
                    ),
                );
                return;
            }
            WeatherRequest::Set(place) => {
                bot_info!("Updating location for {requester} to {place}");
                if let Err(err) = self.locations.set_location(requester, place).await {
                    bot_warn!("Error updating location: {err:#}");
                }
                replies.send(
                    target,
                    &format!("{requester}: Your location has been updated to {place}."),
                );
                return;
            }
            WeatherRequest::Clear => {
                bot_info!("Clearing stored location for {requester}");
                if let Err(err) = self.locations.set_location(requester, "").await {
                    bot_warn!("Error updating location: {err:#}");
                }
                replies.send(
                    target,
                    &format!("{requester}: Your location has been cleared in the database."),
                );
                return;
            }
            WeatherRequest::Place(place) => place.to_string(),
            WeatherRequest::Stored => match self.stored(requester).await {
                Ok(Some(place)) => place,
                Ok(None) => {
                    replies.send(
                        target,
                        &format!(
                            "{requester}: You need to specify a location at least once. (!w set San Francisco, CA)"
                        ),
                    );
                    return;
                }
                Err(err) => {
                    bot_warn!("Error fetching location for {requester} from the database: {err:#}");
                    return;
                }
            },
            WeatherRequest::Nick(nick) => match self.stored(nick).await {
                Ok(Some(place)) => place,
                Ok(None) => {
                    replies.send(
                        target,
                        &format!("{requester}: {nick} hasn't ever set a location."),
                    );
                    return;
                }
                Err(err) => {
                    bot_warn!("Error fetching location for {nick} from the database: {err:#}");
                    return;
                }
            },
        };

        match self.client.current(&location).await {
            Ok(observation) => replies.send(target, &format!("{requester}: {observation}")),
            Err(err) => {
                bot_info!("Error fetching weather data for {location}: {err}");
                replies.send(
                    target,
                    &format!("{requester}: I can't seem to find anything for {location}"),
                );
            }
        }
    }

    /// Stored location of `nick`; a cleared location counts as none.
    async fn stored(&self, nick: &str) -> anyhow::Result<Option<String>> {
        let location = self.locations.location(nick).await?;
        Ok(location.filter(|place| !place.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_subcommands() {
        assert_eq!(WeatherRequest::parse(""), WeatherRequest::Stored);
        assert_eq!(WeatherRequest::parse("help"), WeatherRequest::Help);
        assert_eq!(WeatherRequest::parse("clear"), WeatherRequest::Clear);
        assert_eq!(
            WeatherRequest::parse("set San Francisco, CA"),
            WeatherRequest::Set("San Francisco, CA")
        );
        assert_eq!(WeatherRequest::parse("@ sadbox"), WeatherRequest::Nick("sadbox"));
        assert_eq!(WeatherRequest::parse("Oslo"), WeatherRequest::Place("Oslo"));
    }

    #[test]
    fn compass_points() {
        assert_eq!(compass_direction(0.0), "N");
        assert_eq!(compass_direction(11.0), "N");
        assert_eq!(compass_direction(12.0), "NNE");
        assert_eq!(compass_direction(180.0), "S");
        assert_eq!(compass_direction(350.0), "N");
        assert_eq!(compass_direction(-90.0), "W");
    }

    #[test]
    fn observation_renders_both_units() {
        let observation: Observation = serde_json::from_str(
            r#"{"weather":[{"description":"light rain"},{"description":"mist"}],
                "main":{"temp":283.15,"humidity":87},
                "wind":{"speed":10.0,"deg":270},
                "name":"Oslo"}"#,
        )
        .unwrap();
        assert_eq!(
            observation.to_string(),
            "Light Rain, Mist. 50.0 °F / 10.0 °C. Humidity 87%. Wind from the W at 22.4 m/h / 36.0 km/h. (Oslo)"
        );
    }
}
