use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use reqwest::StatusCode;
use serde::{
    Deserialize,
    Deserializer,
    Serialize,
    de::DeserializeOwned,
};
use std::{
    fmt,
    future::Future,
    time::Duration,
};

pub mod cache;

pub use cache::{
    CacheKey,
    CachedGateway,
    QueryCache,
};

pub const DEFAULT_ENDPOINT: &str = "https://backend-telbot.onrender.com";

const GET_USER: &str = "query GetUser($username: String!) {
  getUser(username: $username) {
    id
    username
    coins
  }
}";

const CREATE_USER: &str = "mutation CreateUser($username: String!) {
  createUser(username: $username) {
    id
    username
    coins
  }
}";

const UPDATE_COINS: &str = "mutation UpdateCoins($id: ID!, $coins: Int!) {
  updateCoins(id: $id, coins: $coins) {
    id
    coins
  }
}";

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Player {
    pub id: String,
    pub username: String,
    pub coins: u64,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CoinUpdate {
    pub id: String,
    pub coins: u64,
}

/// The three remote operations the game relies on.
///
/// Failures are plain errors: callers decide whether to surface or log them,
/// nothing here retries.
pub trait GameGateway: Send + Sync + 'static {
    fn get_user(
        &self,
        username: &str,
    ) -> impl Future<Output = Result<Option<Player>>> + Send;

    fn create_user(&self, username: &str) -> impl Future<Output = Result<Player>> + Send;

    fn update_coins(
        &self,
        id: &str,
        coins: u64,
    ) -> impl Future<Output = Result<CoinUpdate>> + Send;
}

/// GraphQL-over-HTTP transport for [`GameGateway`].
#[derive(Clone)]
pub struct GraphqlGateway {
    endpoint: String,
    http: reqwest::Client,
}

impl GraphqlGateway {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        if endpoint.is_empty() {
            return Err(eyre!("GraphQL endpoint must not be empty"));
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .wrap_err("failed to build HTTP client for GraphQL endpoint")?;
        Ok(Self { endpoint, http })
    }

    async fn execute<V, D>(&self, operation: &str, query: &str, variables: V) -> Result<D>
    where
        V: Serialize,
        D: DeserializeOwned,
    {
        let res = self
            .http
            .post(&self.endpoint)
            .json(&GraphqlRequest { query, variables })
            .send()
            .await
            .wrap_err_with(|| format!("{operation} request failed"))?;
        let status = res.status();
        let bytes = res
            .bytes()
            .await
            .wrap_err_with(|| format!("failed to read {operation} response body"))?;
        if !status.is_success() && status != StatusCode::BAD_REQUEST {
            let body = String::from_utf8_lossy(&bytes);
            return Err(eyre!(
                "GraphQL endpoint responded with {status} to {operation}: {body}"
            ));
        }
        let response: GraphqlResponse<D> = serde_json::from_slice(&bytes)
            .wrap_err_with(|| format!("invalid {operation} payload"))?;
        if !response.errors.is_empty() {
            let messages = response
                .errors
                .into_iter()
                .map(|e| e.message)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(eyre!("{operation} failed: {messages}"));
        }
        response
            .data
            .ok_or_else(|| eyre!("{operation} returned no data ({status})"))
    }
}

impl GameGateway for GraphqlGateway {
    async fn get_user(&self, username: &str) -> Result<Option<Player>> {
        let data: GetUserData = self
            .execute("getUser", GET_USER, UsernameVars { username })
            .await?;
        data.get_user.map(Player::try_from).transpose()
    }

    async fn create_user(&self, username: &str) -> Result<Player> {
        let data: CreateUserData = self
            .execute("createUser", CREATE_USER, UsernameVars { username })
            .await?;
        let dto = data
            .create_user
            .ok_or_else(|| eyre!("createUser returned no player for {username}"))?;
        Player::try_from(dto)
    }

    async fn update_coins(&self, id: &str, coins: u64) -> Result<CoinUpdate> {
        let coins = i32::try_from(coins)
            .map_err(|_| eyre!("coin balance {coins} exceeds the GraphQL Int range"))?;
        let data: UpdateCoinsData = self
            .execute("updateCoins", UPDATE_COINS, UpdateCoinsVars { id, coins })
            .await?;
        let dto = data
            .update_coins
            .ok_or_else(|| eyre!("updateCoins returned no record for {id}"))?;
        Ok(CoinUpdate {
            id: dto.id,
            coins: coins_from_int(dto.coins)?,
        })
    }
}

impl fmt::Display for GraphqlGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.endpoint)
    }
}

#[derive(Serialize)]
struct GraphqlRequest<'a, V> {
    query: &'a str,
    variables: V,
}

#[derive(Serialize)]
struct UsernameVars<'a> {
    username: &'a str,
}

#[derive(Serialize)]
struct UpdateCoinsVars<'a> {
    id: &'a str,
    coins: i32,
}

#[derive(Deserialize)]
struct GraphqlResponse<D> {
    data: Option<D>,
    #[serde(default)]
    errors: Vec<GraphqlErrorDto>,
}

#[derive(Deserialize)]
struct GraphqlErrorDto {
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetUserData {
    get_user: Option<PlayerDto>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateUserData {
    create_user: Option<PlayerDto>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateCoinsData {
    update_coins: Option<CoinUpdateDto>,
}

#[derive(Deserialize)]
struct PlayerDto {
    #[serde(deserialize_with = "graphql_id")]
    id: String,
    username: String,
    coins: i64,
}

#[derive(Deserialize)]
struct CoinUpdateDto {
    #[serde(deserialize_with = "graphql_id")]
    id: String,
    coins: i64,
}

impl TryFrom<PlayerDto> for Player {
    type Error = color_eyre::Report;

    fn try_from(dto: PlayerDto) -> Result<Self> {
        Ok(Player {
            id: dto.id,
            username: dto.username,
            coins: coins_from_int(dto.coins)?,
        })
    }
}

fn coins_from_int(coins: i64) -> Result<u64> {
    u64::try_from(coins).map_err(|_| eyre!("remote store reported negative coins: {coins}"))
}

// GraphQL `ID` is serialized as a string, but some servers send numbers.
fn graphql_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn get_user_payload__null_user__decodes_as_absent() {
        // given
        let body = r#"{"data":{"getUser":null}}"#;

        // when
        let response: GraphqlResponse<GetUserData> = serde_json::from_str(body).unwrap();

        // then
        assert!(response.errors.is_empty());
        assert!(response.data.unwrap().get_user.is_none());
    }

    #[test]
    fn player_dto__numeric_id__is_normalized_to_string() {
        // given
        let body = r#"{"id":17,"username":"@bot","coins":5}"#;

        // when
        let dto: PlayerDto = serde_json::from_str(body).unwrap();
        let player = Player::try_from(dto).unwrap();

        // then
        assert_eq!(
            player,
            Player {
                id: "17".to_string(),
                username: "@bot".to_string(),
                coins: 5,
            }
        );
    }

    #[test]
    fn player_dto__negative_coins__is_rejected() {
        // given
        let dto = PlayerDto {
            id: "a".to_string(),
            username: "@bot".to_string(),
            coins: -1,
        };

        // when
        let result = Player::try_from(dto);

        // then
        assert!(result.is_err());
    }

    #[test]
    fn update_coins_request__serializes_schema_variables() {
        // given
        let request = GraphqlRequest {
            query: UPDATE_COINS,
            variables: UpdateCoinsVars {
                id: "abc",
                coins: 12,
            },
        };

        // when
        let json = serde_json::to_value(&request).unwrap();

        // then
        assert_eq!(json["variables"], serde_json::json!({"id": "abc", "coins": 12}));
        assert!(json["query"].as_str().unwrap().contains("updateCoins(id: $id, coins: $coins)"));
    }

    #[test]
    fn new__empty_endpoint__is_rejected() {
        // when
        let result = GraphqlGateway::new("/", Duration::from_secs(1));

        // then
        assert!(result.is_err());
    }

    #[test]
    fn new__trims_trailing_slash() {
        // when
        let gateway = GraphqlGateway::new("http://localhost:4000/", Duration::from_secs(1))
            .unwrap();

        // then
        assert_eq!(gateway.to_string(), "http://localhost:4000");
    }
}
