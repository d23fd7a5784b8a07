mod common;

use anyhow::Result;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use obe_api::database::models::cpl::CplInput;
use obe_api::database::models::cpmk::CpmkInput;
use obe_api::database::models::mapping::{CplCpmk, CplMkStatus, MappingPair, PlCpl};
use obe_api::database::models::mata_kuliah::MataKuliahInput;
use obe_api::database::models::profil_lulusan::ProfilLulusanInput;
use obe_api::database::models::{Cpl, Cpmk, MataKuliah, ProfilLulusan};
use obe_api::services::cpl_mk_service::CplMkEntry;
use obe_api::services::{CatalogService, CplMkService, MappingService, ServiceError};
use obe_api::types::TenantScope;

async fn profil(pool: &PgPool, scope: TenantScope) -> Result<Uuid> {
    let row = CatalogService::<ProfilLulusan>::new(pool.clone(), scope)
        .create(
            ProfilLulusanInput {
                kode_pl: Some(common::unique("PL")),
                nama_profil: Some("Software Engineer".into()),
                ..Default::default()
            },
            None,
        )
        .await?;
    Ok(row.id)
}

async fn cpl(pool: &PgPool, scope: TenantScope) -> Result<Uuid> {
    let row = CatalogService::<Cpl>::new(pool.clone(), scope)
        .create(
            CplInput {
                kode_cpl: Some(common::unique("CPL")),
                kategori: Some("pengetahuan".into()),
                sumber: Some("KKNI".into()),
                ..Default::default()
            },
            None,
        )
        .await?;
    Ok(row.id)
}

async fn mata_kuliah(pool: &PgPool, scope: TenantScope) -> Result<Uuid> {
    let row = CatalogService::<MataKuliah>::new(pool.clone(), scope)
        .create(
            MataKuliahInput {
                kode_mk: Some(common::unique("MK")),
                nama_mk: Some("Basis Data".into()),
                sks: Some(3),
                semester: Some(3),
                jenis: Some("wajib".into()),
                ..Default::default()
            },
            None,
        )
        .await?;
    Ok(row.id)
}

async fn cpmk(pool: &PgPool, scope: TenantScope, mata_kuliah_id: Uuid, urutan: i32) -> Result<Uuid> {
    let row = CatalogService::<Cpmk>::new(pool.clone(), scope)
        .create(
            CpmkInput {
                mata_kuliah_id: Some(mata_kuliah_id),
                kode_cpmk: Some(common::unique("CPMK")),
                bobot_persen: Some(Decimal::new(25, 0)),
                urutan: Some(urutan),
                ..Default::default()
            },
            None,
        )
        .await?;
    Ok(row.id)
}

fn related(links: &[obe_api::database::models::mapping::MappingLink]) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = links.iter().map(|l| l.related_id).collect();
    ids.sort();
    ids
}

#[tokio::test]
async fn replace_is_idempotent_and_keeps_surviving_links() -> Result<()> {
    let Some(pool) = common::database().await else { return Ok(()) };
    let scope = TenantScope::ProgramStudi(common::program_studi(&pool).await?);
    let pl = profil(&pool, scope).await?;
    let (c1, c2, c3) = (cpl(&pool, scope).await?, cpl(&pool, scope).await?, cpl(&pool, scope).await?);

    let service = MappingService::new(pool.clone(), scope);
    let table = &PlCpl::TABLE;

    // Duplicates in the request collapse to one link
    let first = service.replace(table, pl, &[c1, c2, c2]).await?;
    let again = service.replace(table, pl, &[c2, c1]).await?;
    let mut expected = vec![c1, c2];
    expected.sort();
    assert_eq!(related(&first), expected);
    assert_eq!(related(&again), expected);

    let kept = first.iter().find(|l| l.related_id == c2).map(|l| l.id);
    let shifted = service.replace(table, pl, &[c2, c3]).await?;
    let mut expected = vec![c2, c3];
    expected.sort();
    assert_eq!(related(&shifted), expected);
    assert_eq!(shifted.iter().find(|l| l.related_id == c2).map(|l| l.id), kept);
    Ok(())
}

#[tokio::test]
async fn related_ids_from_another_program_studi_are_rejected() -> Result<()> {
    let Some(pool) = common::database().await else { return Ok(()) };
    let own = TenantScope::ProgramStudi(common::program_studi(&pool).await?);
    let other = TenantScope::ProgramStudi(common::program_studi(&pool).await?);
    let pl = profil(&pool, own).await?;
    let foreign = cpl(&pool, other).await?;

    let result = MappingService::new(pool.clone(), TenantScope::All)
        .replace(&PlCpl::TABLE, pl, &[foreign])
        .await;
    match result {
        Err(ServiceError::MissingReferences { ids, .. }) => assert_eq!(ids, vec![foreign]),
        other => panic!("expected missing references, got {:?}", other.map(|l| l.len())),
    }
    Ok(())
}

#[tokio::test]
async fn referenced_entities_cannot_be_deleted() -> Result<()> {
    let Some(pool) = common::database().await else { return Ok(()) };
    let scope = TenantScope::ProgramStudi(common::program_studi(&pool).await?);
    let pl = profil(&pool, scope).await?;
    let target = cpl(&pool, scope).await?;

    let mappings = MappingService::new(pool.clone(), scope);
    mappings.replace(&PlCpl::TABLE, pl, &[target]).await?;

    let cpls = CatalogService::<Cpl>::new(pool.clone(), scope);
    match cpls.delete(target).await {
        Err(ServiceError::InUse(message)) => assert!(message.starts_with("Cannot delete CPL")),
        other => panic!("expected in-use refusal, got {:?}", other),
    }
    assert_eq!(cpls.get(target).await?.id, target);

    // Clearing the set releases the reference
    assert!(mappings.replace(&PlCpl::TABLE, pl, &[]).await?.is_empty());
    cpls.delete(target).await?;
    Ok(())
}

#[tokio::test]
async fn cpl_mk_replace_sets_then_clears() -> Result<()> {
    let Some(pool) = common::database().await else { return Ok(()) };
    let scope = TenantScope::ProgramStudi(common::program_studi(&pool).await?);
    let target = cpl(&pool, scope).await?;
    let (mk1, mk2) = (mata_kuliah(&pool, scope).await?, mata_kuliah(&pool, scope).await?);

    let entry = |mata_kuliah_id, status| CplMkEntry {
        mata_kuliah_id,
        status,
        semester_target: Some(3),
        bobot_status: Decimal::ONE,
    };

    let service = CplMkService::new(pool.clone(), scope);
    let rows = service
        .replace(target, &[entry(mk1, CplMkStatus::I), entry(mk2, CplMkStatus::M)])
        .await?;
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().any(|r| r.mata_kuliah_id == mk2 && r.status == CplMkStatus::M));

    let rows = service.replace(target, &[entry(mk2, CplMkStatus::A)]).await?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, CplMkStatus::A);

    assert!(service.replace(target, &[]).await?.is_empty());
    assert!(service.list(Some(target), None).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn failed_replace_leaves_no_rows() -> Result<()> {
    let Some(pool) = common::database().await else { return Ok(()) };
    let own = TenantScope::ProgramStudi(common::program_studi(&pool).await?);
    let other = TenantScope::ProgramStudi(common::program_studi(&pool).await?);
    let pl = profil(&pool, own).await?;
    let target = cpl(&pool, own).await?;
    let table = &PlCpl::TABLE;
    let everything = MappingService::new(pool.clone(), TenantScope::All);

    let unknown = Uuid::new_v4();
    match everything.replace(table, unknown, &[target]).await {
        Err(ServiceError::MissingReferences { ids, .. }) => assert_eq!(ids, vec![unknown]),
        other => panic!("expected missing anchor, got {:?}", other.map(|l| l.len())),
    }
    assert!(everything.list(table, Some(unknown)).await?.is_empty());

    // The anchor exists but lies outside the caller's program studi
    match MappingService::new(pool.clone(), other).replace(table, pl, &[target]).await {
        Err(ServiceError::MissingReferences { ids, .. }) => assert_eq!(ids, vec![pl]),
        other => panic!("expected missing anchor, got {:?}", other.map(|l| l.len())),
    }
    assert!(everything.list(table, Some(pl)).await?.is_empty());

    // One bad related id rejects the whole set and keeps the old one
    let scoped = MappingService::new(pool.clone(), own);
    scoped.replace(table, pl, &[target]).await?;
    let second = cpl(&pool, own).await?;
    assert!(scoped.replace(table, pl, &[second, Uuid::new_v4()]).await.is_err());
    assert_eq!(related(&everything.list(table, Some(pl)).await?), vec![target]);
    Ok(())
}

#[tokio::test]
async fn cpl_cpmk_replace_spreads_contribution_evenly() -> Result<()> {
    let Some(pool) = common::database().await else { return Ok(()) };
    let scope = TenantScope::ProgramStudi(common::program_studi(&pool).await?);
    let target = cpl(&pool, scope).await?;
    let mk = mata_kuliah(&pool, scope).await?;
    let (a, b, c) = (
        cpmk(&pool, scope, mk, 1).await?,
        cpmk(&pool, scope, mk, 2).await?,
        cpmk(&pool, scope, mk, 3).await?,
    );

    let service = MappingService::new(pool.clone(), scope);
    let table = &CplCpmk::TABLE;

    let links = service.replace(table, target, &[a, b]).await?;
    assert_eq!(links.len(), 2);
    assert!(links.iter().all(|l| l.weight == Some(Decimal::new(50, 0))));

    // Existing links are rewritten too, not only the new one
    let links = service.replace(table, target, &[a, b, c]).await?;
    assert_eq!(links.len(), 3);
    assert!(links.iter().all(|l| l.weight == Some(Decimal::new(3333, 2))));

    let links = service.replace(table, target, &[c]).await?;
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].weight, Some(Decimal::ONE_HUNDRED));
    Ok(())
}
