//! # Valorant Client
//!
//! The public entry point: every `fetch_*` call goes through the shared
//! [`RequestDispatcher`] and its decoded payload through the
//! [`ConnectionState`], so repeated fetches of one entity return the same
//! `Arc`. The `get_*` accessors only read the cache and never hit the
//! network.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, instrument};

use crate::errors::ValorantError;
use crate::models::{Account, Agent, Buddy, BuddyLevel, Ceremony, Language};
use crate::retrieve::{EndpointFamily, RequestDispatcher, RequestEvent, Route};
use crate::state::{store_each, ConnectionState};

const ACCOUNT_BY_PUUID: &str = "/riot/account/v1/accounts/by-puuid/{puuid}";
const ACCOUNT_BY_RIOT_ID: &str = "/riot/account/v1/accounts/by-riot-id/{game_name}/{tag_line}";

/// Client over the community game-data API and the Riot account API.
///
/// Cloning is cheap; clones share one dispatcher (and so one set of bucket
/// locks and one cooldown gate) and one cache.
#[derive(Clone)]
pub struct ValorantClient {
    http: Arc<RequestDispatcher>,
    state: Arc<ConnectionState>,
}

impl ValorantClient {
    /// Client with the production transport and default retry policy.
    pub fn new(token: Option<String>, riot_api_key: Option<String>) -> Self {
        Self::from_parts(RequestDispatcher::new(token, riot_api_key), ConnectionState::new())
    }

    pub fn from_parts(http: RequestDispatcher, state: ConnectionState) -> Self {
        Self {
            http: Arc::new(http),
            state: Arc::new(state),
        }
    }

    pub fn http(&self) -> &RequestDispatcher {
        &self.http
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    /// Per-attempt request events, see [`RequestDispatcher::subscribe`].
    pub fn subscribe(&self) -> broadcast::Receiver<RequestEvent> {
        self.http.subscribe()
    }

    async fn get(&self, route: Route) -> Result<Value, ValorantError> {
        self.http.send::<()>(&route, None).await
    }

    #[instrument(skip(self), level = "debug")]
    pub async fn fetch_agents(
        &self,
        language: Option<Language>,
        is_playable_character: Option<bool>,
    ) -> Result<Vec<Arc<Agent>>, ValorantError> {
        let mut route = localized(Route::get("/agents"), language);
        if let Some(playable) = is_playable_character {
            route = route.query("isPlayableCharacter", playable);
        }
        let payload = self.get(route).await?;
        let agents = store_each(payload, |v| self.state.store_agent(v))?;
        debug!(count = agents.len(), "fetched agents");
        Ok(agents)
    }

    #[instrument(skip(self), level = "debug")]
    pub async fn fetch_agent(&self, uuid: &str, language: Option<Language>) -> Result<Arc<Agent>, ValorantError> {
        let route = localized(Route::get("/agents/{uuid}").param("uuid", uuid), language);
        let payload = self.get(route).await?;
        self.state.store_agent(payload)
    }

    #[instrument(skip(self), level = "debug")]
    pub async fn fetch_buddies(&self, language: Option<Language>) -> Result<Vec<Arc<Buddy>>, ValorantError> {
        let payload = self.get(localized(Route::get("/buddies"), language)).await?;
        let buddies = store_each(payload, |v| self.state.store_buddy(v))?;
        debug!(count = buddies.len(), "fetched buddies");
        Ok(buddies)
    }

    #[instrument(skip(self), level = "debug")]
    pub async fn fetch_buddy(&self, uuid: &str, language: Option<Language>) -> Result<Arc<Buddy>, ValorantError> {
        let route = localized(Route::get("/buddies/{uuid}").param("uuid", uuid), language);
        let payload = self.get(route).await?;
        self.state.store_buddy(payload)
    }

    #[instrument(skip(self), level = "debug")]
    pub async fn fetch_buddy_levels(&self, language: Option<Language>) -> Result<Vec<Arc<BuddyLevel>>, ValorantError> {
        let payload = self.get(localized(Route::get("/buddies/levels"), language)).await?;
        store_each(payload, |v| self.state.store_buddy_level(v))
    }

    #[instrument(skip(self), level = "debug")]
    pub async fn fetch_buddy_level(
        &self,
        uuid: &str,
        language: Option<Language>,
    ) -> Result<Arc<BuddyLevel>, ValorantError> {
        let route = localized(Route::get("/buddies/levels/{uuid}").param("uuid", uuid), language);
        let payload = self.get(route).await?;
        self.state.store_buddy_level(payload)
    }

    #[instrument(skip(self), level = "debug")]
    pub async fn fetch_ceremonies(&self, language: Option<Language>) -> Result<Vec<Arc<Ceremony>>, ValorantError> {
        let payload = self.get(localized(Route::get("/ceremonies"), language)).await?;
        store_each(payload, |v| self.state.store_ceremony(v))
    }

    #[instrument(skip(self), level = "debug")]
    pub async fn fetch_ceremony(&self, uuid: &str, language: Option<Language>) -> Result<Arc<Ceremony>, ValorantError> {
        let route = localized(Route::get("/ceremonies/{uuid}").param("uuid", uuid), language);
        let payload = self.get(route).await?;
        self.state.store_ceremony(payload)
    }

    /// Looks an account up on the Riot API. Needs a Riot API key.
    #[instrument(skip(self), level = "debug")]
    pub async fn fetch_account_by_puuid(&self, puuid: &str) -> Result<Arc<Account>, ValorantError> {
        let route = Route::get(ACCOUNT_BY_PUUID).family(EndpointFamily::Riot).param("puuid", puuid);
        let payload = self.get(route).await?;
        self.state.store_account(payload)
    }

    /// Looks an account up by `gameName` and `tagLine` on the Riot API.
    #[instrument(skip(self), level = "debug")]
    pub async fn fetch_account_by_riot_id(&self, game_name: &str, tag_line: &str) -> Result<Arc<Account>, ValorantError> {
        let route = Route::get(ACCOUNT_BY_RIOT_ID)
            .family(EndpointFamily::Riot)
            .param("game_name", game_name)
            .param("tag_line", tag_line);
        let payload = self.get(route).await?;
        self.state.store_account(payload)
    }

    pub fn get_agent(&self, uuid: &str) -> Option<Arc<Agent>> {
        self.state.agents().get(uuid)
    }

    pub fn get_buddy(&self, uuid: &str) -> Option<Arc<Buddy>> {
        self.state.buddies().get(uuid)
    }

    pub fn get_buddy_level(&self, uuid: &str) -> Option<Arc<BuddyLevel>> {
        self.state.buddy_levels().get(uuid)
    }

    pub fn get_ceremony(&self, uuid: &str) -> Option<Arc<Ceremony>> {
        self.state.ceremonies().get(uuid)
    }

    pub fn get_account(&self, puuid: &str) -> Option<Arc<Account>> {
        self.state.accounts().get(puuid)
    }

    /// Forgets every cached entity. The next fetch of any key builds a new
    /// instance.
    pub fn clear_cache(&self) {
        self.state.clear();
    }
}

fn localized(route: Route, language: Option<Language>) -> Route {
    match language {
        Some(language) => route.query("language", language),
        None => route,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieve::dispatcher::RetryPolicy;
    use crate::retrieve::transport::{OutgoingRequest, RawResponse, Transport, TransportError};
    use async_trait::async_trait;
    use bytes::Bytes;
    use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
    use serde_json::json;
    use std::sync::Mutex;

    /// Answers by URL path and records the URLs it was asked for.
    struct FakeApi {
        routes: Vec<(&'static str, Value)>,
        seen: Mutex<Vec<url::Url>>,
    }

    #[async_trait]
    impl Transport for FakeApi {
        async fn execute(&self, request: OutgoingRequest) -> Result<RawResponse, TransportError> {
            let path = request.url.path().to_string();
            self.seen.lock().unwrap().push(request.url);
            let mut headers = HeaderMap::new();
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            let (status, body) = match self.routes.iter().find(|(p, _)| *p == path) {
                Some((_, body)) => (200, body.clone()),
                None => (404, json!({"status": 404, "error": "not found"})),
            };
            Ok(RawResponse {
                status,
                headers,
                body: Bytes::from(serde_json::to_vec(&body).unwrap()),
            })
        }
    }

    fn client(routes: Vec<(&'static str, Value)>) -> (ValorantClient, Arc<FakeApi>) {
        let api = Arc::new(FakeApi {
            routes,
            seen: Mutex::new(Vec::new()),
        });
        let http = RequestDispatcher::with_transport(api.clone(), RetryPolicy::default());
        (ValorantClient::from_parts(http, ConnectionState::new()), api)
    }

    const JETT: &str = "add6443a-41bd-e414-f6ad-e58d267f4e95";

    fn agent(name: &str) -> Value {
        json!({
            "uuid": JETT,
            "displayName": name,
            "description": "Representing her home country of South Korea.",
            "developerName": "Wushu",
            "displayIcon": format!("https://media.valorant-api.com/agents/{}/displayicon.png", JETT),
            "assetPath": "ShooterGame/Content/Characters/Wushu/Wushu_PrimaryAsset",
            "isPlayableCharacter": true,
            "abilities": []
        })
    }

    #[tokio::test]
    async fn repeated_fetches_share_one_instance() {
        let (client, _) = client(vec![("/v1/agents/add6443a-41bd-e414-f6ad-e58d267f4e95", json!({"status": 200, "data": agent("Jett")}))]);

        let first = client.fetch_agent(JETT, None).await.unwrap();
        let second = client.fetch_agent(JETT, None).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&first, &client.get_agent(JETT).unwrap()));

        client.clear_cache();
        assert!(client.get_agent(JETT).is_none());
        let third = client.fetch_agent(JETT, None).await.unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
    }

    #[tokio::test]
    async fn list_fetch_sends_only_provided_filters() {
        let (client, api) = client(vec![("/v1/agents", json!({"status": 200, "data": [agent("Jett")]}))]);

        let agents = client.fetch_agents(Some(Language::Japanese), Some(true)).await.unwrap();
        assert_eq!(agents.len(), 1);
        client.fetch_agents(None, None).await.unwrap();

        let seen = api.seen.lock().unwrap();
        assert_eq!(seen[0].query(), Some("language=ja-JP&isPlayableCharacter=true"));
        assert_eq!(seen[1].query(), None);
    }

    #[tokio::test]
    async fn list_and_single_fetch_agree_on_identity() {
        let (client, _) = client(vec![
            ("/v1/agents", json!({"status": 200, "data": [agent("Jett")]})),
            ("/v1/agents/add6443a-41bd-e414-f6ad-e58d267f4e95", json!({"status": 200, "data": agent("Jett v2")})),
        ]);

        let listed = client.fetch_agents(None, None).await.unwrap();
        let single = client.fetch_agent(JETT, None).await.unwrap();
        assert!(Arc::ptr_eq(&listed[0], &single));
        assert_eq!(single.display_name, "Jett");
    }

    #[tokio::test]
    async fn buddy_fetch_populates_levels() {
        let buddy = "ad508aeb-44b7-46bf-f923-959267483e78";
        let level = "6d57a8a3-4b03-3ae8-f4ee-5f9a4a4d4d1e";
        let (client, _) = client(vec![(
            "/v1/buddies/ad508aeb-44b7-46bf-f923-959267483e78",
            json!({"status": 200, "data": {
                "uuid": buddy,
                "displayName": "Dreamwing Buddy",
                "isHiddenIfNotOwned": false,
                "themeUuid": null,
                "displayIcon": format!("https://media.valorant-api.com/buddies/{}/displayicon.png", buddy),
                "assetPath": "ShooterGame/Content/Equippables/Buddies/Dreamwing",
                "levels": [{
                    "uuid": level,
                    "charmLevel": 1,
                    "displayName": "Dreamwing Buddy",
                    "displayIcon": format!("https://media.valorant-api.com/buddylevels/{}/displayicon.png", level),
                    "assetPath": "ShooterGame/Content/Equippables/Buddies/Dreamwing/Lv1"
                }]
            }}),
        )]);

        let fetched = client.fetch_buddy(buddy, None).await.unwrap();
        let cached_level = client.get_buddy_level(level).unwrap();
        assert!(Arc::ptr_eq(&fetched.levels[0], &cached_level));
    }

    #[tokio::test]
    async fn accounts_use_the_riot_family_without_envelope() {
        let (client, api) = client(vec![(
            "/riot/account/v1/accounts/by-riot-id/Tenz/0505",
            json!({"puuid": "p-1", "gameName": "Tenz", "tagLine": "0505"}),
        )]);

        let account = client.fetch_account_by_riot_id("Tenz", "0505").await.unwrap();
        assert_eq!(account.riot_id().as_deref(), Some("Tenz#0505"));
        assert!(client.get_account("p-1").is_some());
        assert_eq!(api.seen.lock().unwrap()[0].host_str(), Some("americas.api.riotgames.com"));
    }

    #[tokio::test]
    async fn failures_leave_the_cache_untouched() {
        let (client, _) = client(vec![]);
        let err = client.fetch_ceremony("missing", None).await.unwrap_err();
        assert!(matches!(err, ValorantError::NotFound(_)));
        assert!(client.state().ceremonies().is_empty());
    }
}
